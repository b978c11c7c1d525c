//! Extensions for use cases that [`Iterator`] doesn't handle natively quite yet

use crate::kvp::{Label, LabelError, Labels};

/// This is a fallible version of the std [`FromIterator`] trait.
///
/// It will immediately return an error if processing failed and will not
/// continue to process items.
pub trait TryFromIterator<T>: Sized {
    type Error: std::error::Error;

    fn try_from_iter<I: IntoIterator<Item = T>>(iter: I) -> Result<Self, Self::Error>;
}

impl<'a> TryFromIterator<(&'a str, &'a str)> for Labels {
    type Error = LabelError;

    fn try_from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(
        iter: I,
    ) -> Result<Self, Self::Error> {
        iter.into_iter()
            .map(Label::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from_iter)
    }
}
