//! Boilerplate-reducing macros used throughout the crate.

/// Implement `From<$from> for $to` using the given `Snafu` context selector.
///
/// `snafu` does not generate `From` impls for variants that carry a `source`
/// field (you are expected to use `.context(...)`), but for some ubiquitous
/// conversions an automatic `?` conversion is much more convenient.
#[macro_export]
macro_rules! impl_auto_error_conversion {
    ($from:ty, $to:ty, $selector:expr) => {
        impl From<$from> for $to {
            fn from(source: $from) -> Self {
                use snafu::IntoError;
                $selector.into_error(source)
            }
        }
    };
}
