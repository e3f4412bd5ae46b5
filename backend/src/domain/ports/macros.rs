//! Helper macro for generating port error enums.
//!
//! Each generated enum derives `thiserror::Error`, gets a snake_case
//! constructor per variant accepting `impl Into<T>` for every field, and a
//! `kind()` accessor used as a structured logging field.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            #[doc = "Construct the `" $variant "` variant."]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            #[doc = "Construct the `" $variant "` variant."]
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };

    (@pattern $variant:ident) => { Self::$variant };
    (@pattern $variant:ident { $($field:ident : $ty:ty),* }) => { Self::$variant { .. } };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*

            /// Stable snake_case name of the variant for log fields.
            pub fn kind(&self) -> &'static str {
                match self {
                    $(
                        define_port_error!(@pattern $variant $( { $($field : $ty),* } )?) => {
                            ::paste::paste! { stringify!([<$variant:snake>]) }
                        }
                    )*
                }
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for the generated constructors and kinds.
    define_port_error! {
        pub enum SamplePortError {
            Offline => "backend offline",
            Timeout { message: String } => "timed out: {message}",
            Throttled { message: String, retries: u32 } => "throttled: {message} ({retries})",
        }
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = SamplePortError::timeout("slow");
        assert_eq!(err.to_string(), "timed out: slow");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = SamplePortError::throttled("busy", 3_u32);
        assert_eq!(err.to_string(), "throttled: busy (3)");
    }

    #[test]
    fn kind_reports_snake_case_variant_names() {
        assert_eq!(SamplePortError::offline().kind(), "offline");
        assert_eq!(SamplePortError::timeout("x").kind(), "timeout");
        assert_eq!(SamplePortError::throttled("x", 1_u32).kind(), "throttled");
    }
}
