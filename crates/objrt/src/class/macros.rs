// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

/// Declare the static descriptor of a class.
///
/// The struct embeds its direct base as a field (`base` by convention).
/// Ancestors are listed nearest first, each with its descriptor static and
/// the field path to its segment; the list must end at `Object` and repeat
/// the direct base's own ancestors in order. [`ClassDef::validate`] rejects
/// a list that skips an ancestor or pairs a type with another class's
/// descriptor.
///
/// [`ClassDef::validate`]: crate::ClassDef::validate
///
/// ```rust
/// use objrt::{define_class, Lifecycle, Object};
/// use objrt::object::OBJECT_CLASS;
///
/// #[repr(C)]
/// pub struct Counter {
///     pub base: Object,
///     pub hits: u32,
/// }
///
/// impl Lifecycle for Counter {}
///
/// define_class! {
///     pub static COUNTER_CLASS: Counter {
///         id: 0x51b0e1,
///         name: "Counter",
///         ancestors: [Object: OBJECT_CLASS => base],
///     }
/// }
///
/// assert_eq!(COUNTER_CLASS.relatives().len(), 2);
/// ```
///
/// Besides the static, the macro implements [`Class`](crate::Class) for the
/// type and `AsRef`/`AsMut` for every ancestor. The type must satisfy the
/// safety contract of `Class`; types that need `Drop` are rejected at
/// compile time.
#[macro_export]
macro_rules! define_class {
    (
        $(#[$attr:meta])*
        $vis:vis static $def:ident : $ty:ty {
            id: $id:expr,
            name: $name:literal,
            ancestors: [ $( $anc:ty : $anc_def:path => $($field:ident).+ ),* $(,)? ] $(,)?
        }
    ) => {
        $(#[$attr])*
        $vis static $def: $crate::ClassDef = $crate::ClassDef {
            id: $crate::ClassId($id),
            size: ::core::mem::size_of::<$ty>(),
            align: ::core::mem::align_of::<$ty>(),
            name: $crate::class::debug_name($name),
            instance_type: ::core::any::TypeId::of::<$ty>,
            create: $crate::class::create_instance::<$ty>,
            cast_info: $crate::CastInfo {
                relatives: &[
                    $crate::RttiEntry {
                        class: &$def,
                        offset: 0,
                        segment_type: ::core::any::TypeId::of::<$ty>,
                        ctor: $crate::class::construct_segment::<$ty>,
                        dtor: $crate::class::destruct_segment::<$ty>,
                    },
                    $(
                        $crate::RttiEntry {
                            class: &$anc_def,
                            offset: ::core::mem::offset_of!($ty, $($field).+),
                            segment_type: ::core::any::TypeId::of::<$anc>,
                            ctor: $crate::class::construct_segment::<$anc>,
                            dtor: $crate::class::destruct_segment::<$anc>,
                        },
                    )*
                ],
            },
        };

        const _: () = ::core::assert!(
            !::core::mem::needs_drop::<$ty>(),
            "class types are released by Lifecycle::destruct and must not need Drop"
        );

        // SAFETY: the descriptor above is derived from `$ty` itself; the
        // zero-validity requirement is the caller's, as documented on `Class`.
        unsafe impl $crate::Class for $ty {
            fn class_def() -> &'static $crate::ClassDef {
                &$def
            }
        }

        $(
            impl ::core::convert::AsRef<$anc> for $ty {
                fn as_ref(&self) -> &$anc {
                    &self.$($field).+
                }
            }

            impl ::core::convert::AsMut<$anc> for $ty {
                fn as_mut(&mut self) -> &mut $anc {
                    &mut self.$($field).+
                }
            }
        )*
    };
}
