/// Declares a copyable ID newtype over an unsigned integer. IDs print as their bare number and
/// parse back from it, which is how they travel through the ns-3 scripts and result files.
macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $inner:ty) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Display,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// The first ID.
            pub const ZERO: $name = Self::new(0);

            /// The second ID.
            pub const ONE: $name = Self::new(1);

            /// Creates a new ID.
            pub const fn new(val: $inner) -> Self {
                Self(val)
            }

            /// The raw number, e.g. to index per-node tables.
            pub const fn inner(self) -> $inner {
                self.0
            }
        }
    };
}
