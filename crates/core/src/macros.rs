// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared by the mj crates.

/// `Display` for fieldless enums, mapping each variant to its wire name.
///
/// ```ignore
/// mj_core::simple_display! {
///     QueuePolicy {
///         PerJob => "per_job",
///         Local => "local",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident => $name:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let name = match self {
                    $( Self::$variant => $name, )+
                };
                f.write_str(name)
            }
        }
    };
}

/// Chained by-value setters for builder-style structs.
///
/// Fields under `set` take the value as is; fields under `option` are
/// `Option<T>` and the setter takes `impl Into<T>`.
///
/// ```ignore
/// impl JobTicket {
///     mj_core::setters! {
///         set { iteration: u32 }
///         option { target_mapset: String }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(set { $( $field:ident : $ty:ty ),* $(,)? })?
        $(option { $( $opt:ident : $opt_ty:ty ),* $(,)? })?
    ) => {
        $($(
            pub fn $field(mut self, value: $ty) -> Self {
                self.$field = value;
                self
            }
        )*)?
        $($(
            pub fn $opt(mut self, value: impl Into<$opt_ty>) -> Self {
                self.$opt = Some(value.into());
                self
            }
        )*)?
    };
}
