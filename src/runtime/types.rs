//! Runtime type descriptors
//!
//! This module defines [`TypeDesc`], the recursive description of a traced
//! variable's type. It is a closed variant: each kind carries only the
//! fields valid for that kind, so there is no way to ask an `int` for its
//! member table or a struct for its pointee.
//!
//! Sizes and member offsets are computed, not stored. The storage model
//! packs aggregates sequentially with no padding, so a struct member's
//! offset is simply the sum of the sizes of the members before it.

/// Maximum number of array dimensions reported per variable.
///
/// Deeper nestings still trace correctly (the element count covers every
/// leaf), but only the first three dimension sizes are published.
pub const MAX_ARRAY_DIMENSIONS: usize = 3;

/// Storage size of a pointer, matching the address accessors in
/// [`MemoryImage`](crate::runtime::memory::MemoryImage).
pub const POINTER_SIZE_BYTES: usize = 8;

/// One named member of a struct or union.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: TypeDesc,
}

impl Member {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Member {
            name: name.into(),
            ty,
        }
    }
}

/// Recursive type description for a traced variable.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
    Void,
    Int,
    Short,
    Char,
    Long,
    UnsignedInt,
    UnsignedShort,
    UnsignedLong,
    FloatingPoint,
    Pointer { points_to: Box<TypeDesc> },
    Array { element: Box<TypeDesc>, length: usize },
    Struct { tag: String, members: Vec<Member> },
    Union { tag: String, members: Vec<Member> },
    Enum { tag: String },
    Function,
}

impl TypeDesc {
    /// Convenience constructor for a pointer to `points_to`.
    pub fn pointer_to(points_to: TypeDesc) -> Self {
        TypeDesc::Pointer {
            points_to: Box::new(points_to),
        }
    }

    /// Convenience constructor for an array of `length` elements.
    pub fn array_of(element: TypeDesc, length: usize) -> Self {
        TypeDesc::Array {
            element: Box::new(element),
            length,
        }
    }

    /// Size of a value of this type in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            TypeDesc::Void | TypeDesc::Function => 0,
            TypeDesc::Char => 1,
            TypeDesc::Short | TypeDesc::UnsignedShort => 2,
            TypeDesc::Int | TypeDesc::UnsignedInt | TypeDesc::Enum { .. } => 4,
            TypeDesc::Long | TypeDesc::UnsignedLong => 8,
            TypeDesc::FloatingPoint => 8,
            TypeDesc::Pointer { .. } => POINTER_SIZE_BYTES,
            TypeDesc::Array { element, length } => element.size_bytes() * length,
            TypeDesc::Struct { members, .. } => {
                members.iter().map(|m| m.ty.size_bytes()).sum()
            }
            TypeDesc::Union { members, .. } => members
                .iter()
                .map(|m| m.ty.size_bytes())
                .max()
                .unwrap_or(0),
        }
    }

    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeDesc::Void => "void",
            TypeDesc::Int => "int",
            TypeDesc::Short => "short",
            TypeDesc::Char => "char",
            TypeDesc::Long => "long",
            TypeDesc::UnsignedInt => "unsigned int",
            TypeDesc::UnsignedShort => "unsigned short",
            TypeDesc::UnsignedLong => "unsigned long",
            TypeDesc::FloatingPoint => "floating point",
            TypeDesc::Pointer { .. } => "pointer",
            TypeDesc::Array { .. } => "array",
            TypeDesc::Struct { .. } => "struct",
            TypeDesc::Union { .. } => "union",
            TypeDesc::Enum { .. } => "enum",
            TypeDesc::Function => "function",
        }
    }

    /// Walk a (possibly nested) array type and return the published
    /// dimension sizes plus the leaf element type.
    ///
    /// Dimensions are collected outermost-first, stopping at the first
    /// non-array element type; struct, union, and pointer elements are leaf
    /// boundaries, so an array inside a struct element is not flattened.
    /// Returns `None` when `self` is not an array.
    pub fn array_shape(&self) -> Option<(Vec<usize>, &TypeDesc)> {
        let TypeDesc::Array { element, length } = self else {
            return None;
        };
        let mut dims = vec![*length];
        let mut leaf: &TypeDesc = element;
        while let TypeDesc::Array { element, length } = leaf {
            if dims.len() < MAX_ARRAY_DIMENSIONS {
                dims.push(*length);
            }
            leaf = element;
        }
        Some((dims, leaf))
    }
}
