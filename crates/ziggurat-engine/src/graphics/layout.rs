use crate::device::AttributePointer;

/// Scalar family of a vertex attribute component.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarKind {
    Float,
    Int,
    UInt,
}

impl ScalarKind {
    /// Size of one component in bytes.
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            ScalarKind::Float => size_of::<f32>() as u32,
            ScalarKind::Int => size_of::<i32>() as u32,
            ScalarKind::UInt => size_of::<u32>() as u32,
        }
    }

    /// Integer attributes are read without conversion to float.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::UInt)
    }
}

/// Declared type of a vertex attribute: a scalar family and 1–4 components.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttributeType {
    Float,
    Float2,
    Float3,
    Float4,
    Int,
    Int2,
    Int3,
    Int4,
    UInt,
    UInt2,
    UInt3,
    UInt4,
}

impl AttributeType {
    pub const fn scalar(self) -> ScalarKind {
        use AttributeType::*;
        match self {
            Float | Float2 | Float3 | Float4 => ScalarKind::Float,
            Int | Int2 | Int3 | Int4 => ScalarKind::Int,
            UInt | UInt2 | UInt3 | UInt4 => ScalarKind::UInt,
        }
    }

    pub const fn components(self) -> u8 {
        use AttributeType::*;
        match self {
            Float | Int | UInt => 1,
            Float2 | Int2 | UInt2 => 2,
            Float3 | Int3 | UInt3 => 3,
            Float4 | Int4 | UInt4 => 4,
        }
    }

    /// Byte size of one component; also the attribute's alignment.
    #[inline]
    pub const fn component_size(self) -> u32 {
        self.scalar().size()
    }

    /// Byte size of the whole attribute.
    #[inline]
    pub const fn size(self) -> u32 {
        self.component_size() * self.components() as u32
    }
}

/// One attribute placed within a vertex.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AttributeLayout {
    pub name: String,
    pub ty: AttributeType,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
}

impl AttributeLayout {
    /// Read parameters for this attribute in a vertex of `stride` bytes.
    pub fn pointer(&self, stride: u32) -> AttributePointer {
        AttributePointer {
            components: self.ty.components(),
            scalar: self.ty.scalar(),
            stride,
            offset: self.offset,
        }
    }
}

/// Compiled vertex layout: per-attribute offsets plus the vertex stride.
///
/// Attributes keep their declaration order. Each one starts at a multiple of
/// its component size, and the stride is padded to a multiple of the first
/// attribute's component size so consecutive vertices stay aligned.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VertexLayout {
    attributes: Vec<AttributeLayout>,
    stride: u32,
}

impl VertexLayout {
    /// Compiles an ordered `(name, type)` list.
    ///
    /// # Panics
    /// If the list is empty or a name repeats.
    pub fn new<N>(attributes: impl IntoIterator<Item = (N, AttributeType)>) -> Self
    where
        N: Into<String>,
    {
        let mut placed: Vec<AttributeLayout> = Vec::new();
        let mut offset = 0u32;

        for (name, ty) in attributes {
            let name = name.into();
            assert!(
                placed.iter().all(|a| a.name != name),
                "vertex layout declares attribute `{name}` twice"
            );

            offset = align_up(offset, ty.component_size());
            placed.push(AttributeLayout { name, ty, offset });
            offset += ty.size();
        }

        let first = placed
            .first()
            .unwrap_or_else(|| panic!("vertex layout needs at least one attribute"));
        let stride = align_up(offset, first.ty.component_size());

        Self {
            attributes: placed,
            stride,
        }
    }

    /// Byte distance between consecutive vertices.
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Attributes in declaration order.
    #[inline]
    pub fn attributes(&self) -> &[AttributeLayout] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeLayout> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[inline]
fn align_up(value: u32, align: u32) -> u32 {
    value.next_multiple_of(align)
}

#[cfg(test)]
mod tests {
    use super::*;
    use AttributeType::*;

    #[test]
    fn position_uv_layout() {
        let layout = VertexLayout::new([("pos", Float3), ("uv", Float2)]);
        assert_eq!(layout.attribute("pos").map(|a| a.offset), Some(0));
        assert_eq!(layout.attribute("uv").map(|a| a.offset), Some(12));
        assert_eq!(layout.stride(), 20);
    }

    #[test]
    fn declaration_order_is_kept() {
        let layout = VertexLayout::new([("c", Float), ("a", Int2), ("b", UInt4)]);
        let names: Vec<&str> = layout.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn offsets_are_aligned_and_non_decreasing() {
        let all = [
            Float, Float2, Float3, Float4, Int, Int2, Int3, Int4, UInt, UInt2, UInt3, UInt4,
        ];
        let layout = VertexLayout::new(all.iter().enumerate().map(|(i, t)| (format!("a{i}"), *t)));

        let mut prev_end = 0;
        for attr in layout.attributes() {
            assert_eq!(attr.offset % attr.ty.component_size(), 0);
            assert!(attr.offset >= prev_end);
            prev_end = attr.offset + attr.ty.size();
        }
        assert_eq!(layout.stride() % all[0].component_size(), 0);
        assert!(layout.stride() >= prev_end);
    }

    #[test]
    fn single_scalar_stride() {
        let layout = VertexLayout::new([("id", UInt)]);
        assert_eq!(layout.stride(), 4);
    }

    #[test]
    fn type_metadata() {
        assert_eq!(Int3.scalar(), ScalarKind::Int);
        assert_eq!(Int3.components(), 3);
        assert_eq!(UInt4.size(), 16);
        assert!(UInt.scalar().is_integer());
        assert!(!Float2.scalar().is_integer());
    }

    #[test]
    fn pointer_carries_layout() {
        let layout = VertexLayout::new([("pos", Float2), ("tag", Int)]);
        let tag = layout.attribute("tag").map(|a| a.pointer(layout.stride()));
        assert_eq!(
            tag,
            Some(AttributePointer {
                components: 1,
                scalar: ScalarKind::Int,
                stride: 12,
                offset: 8,
            })
        );
    }

    #[test]
    #[should_panic(expected = "at least one attribute")]
    fn empty_layout_panics() {
        let _ = VertexLayout::new(Vec::<(&str, AttributeType)>::new());
    }

    #[test]
    #[should_panic(expected = "twice")]
    fn duplicate_names_panic() {
        let _ = VertexLayout::new([("pos", Float2), ("pos", Float3)]);
    }
}
