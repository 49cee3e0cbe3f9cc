use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;

use anyhow::{Context, Result};
use bytemuck::Pod;

use crate::device::{BackendError, BufferId, BufferTarget, BufferUsage, GraphicsBackend};

use super::{Graphics, VertexLayout};

/// Bytes per index triple (three `u32` indices).
pub const TRIANGLE_INDEX_BYTES: usize = 3 * size_of::<u32>();

/// Opaque handle to a vertex/index array resource.
///
/// Handles come from a monotonic counter and are never reused within a
/// [`Graphics`] instance.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ArrayHandle(NonZeroU32);

impl fmt::Display for ArrayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "array#{}", self.0)
    }
}

/// Update-frequency hints for an array's two buffers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct ArrayUsage {
    pub vertices: BufferUsage,
    pub indices: BufferUsage,
}

/// Everything the registry knows about one array.
#[derive(Debug)]
pub(crate) struct ArrayRecord {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub max_vertices: u32,
    pub max_triangles: u32,
    pub layout: VertexLayout,
}

/// Handle → array metadata.
#[derive(Debug)]
pub(crate) struct ArrayRegistry {
    next: u32,
    records: HashMap<ArrayHandle, ArrayRecord>,
}

impl ArrayRegistry {
    pub fn new() -> Self {
        Self {
            next: 1,
            records: HashMap::new(),
        }
    }

    fn allocate_handle(&mut self) -> ArrayHandle {
        let handle = NonZeroU32::new(self.next)
            .map(ArrayHandle)
            .unwrap_or_else(|| panic!("array handle space exhausted"));
        // Zero marks exhaustion for the next call.
        self.next = self.next.checked_add(1).unwrap_or(0);
        handle
    }

    /// # Panics
    /// If `handle` is unknown or was deleted.
    pub fn get(&self, handle: ArrayHandle) -> &ArrayRecord {
        self.records
            .get(&handle)
            .unwrap_or_else(|| panic!("use of unknown or deleted {handle}"))
    }

    pub fn handles(&self) -> Vec<ArrayHandle> {
        self.records.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl<B: GraphicsBackend> Graphics<B> {
    /// Creates an array with dynamic vertex and index storage.
    ///
    /// See [`create_array_with`](Self::create_array_with).
    pub fn create_array(
        &mut self,
        max_vertices: u32,
        max_triangles: u32,
        layout: VertexLayout,
    ) -> Result<ArrayHandle> {
        self.create_array_with(ArrayUsage::default(), max_vertices, max_triangles, layout)
    }

    /// Reserves `stride × max_vertices` vertex bytes and `12 × max_triangles`
    /// index bytes. Capacities never change afterwards.
    ///
    /// The new array is left bound.
    ///
    /// # Panics
    /// If either capacity is zero.
    pub fn create_array_with(
        &mut self,
        usage: ArrayUsage,
        max_vertices: u32,
        max_triangles: u32,
        layout: VertexLayout,
    ) -> Result<ArrayHandle> {
        assert!(max_vertices != 0, "vertex array needs a non-zero vertex capacity");
        assert!(max_triangles != 0, "vertex array needs a non-zero triangle capacity");

        let vertex_bytes = layout.stride() as usize * max_vertices as usize;
        let index_bytes = TRIANGLE_INDEX_BYTES * max_triangles as usize;

        let vertex_buffer = self
            .backend
            .create_buffer()
            .context("failed to create vertex buffer")?;
        let index_buffer = match self.backend.create_buffer() {
            Ok(buffer) => buffer,
            Err(e) => {
                self.backend.delete_buffer(vertex_buffer);
                return Err(e).context("failed to create index buffer");
            }
        };

        let allocated = self
            .allocate(BufferTarget::Vertex, vertex_buffer, vertex_bytes, usage.vertices)
            .context("failed to allocate vertex storage")
            .and_then(|()| {
                self.allocate(BufferTarget::Index, index_buffer, index_bytes, usage.indices)
                    .context("failed to allocate index storage")
            });
        if let Err(e) = allocated {
            self.backend.delete_buffer(vertex_buffer);
            self.backend.delete_buffer(index_buffer);
            // Whatever array was bound lost its buffer bindings.
            self.bind.array = None;
            return Err(e);
        }

        let handle = self.arrays.allocate_handle();
        log::debug!(
            "created {handle}: {max_vertices} vertices x {} bytes, {max_triangles} triangles",
            layout.stride()
        );

        self.arrays.records.insert(
            handle,
            ArrayRecord {
                vertex_buffer,
                index_buffer,
                max_vertices,
                max_triangles,
                layout,
            },
        );
        self.bind.array = Some(handle);

        Ok(handle)
    }

    /// Releases the array's buffers and forgets its metadata.
    ///
    /// # Panics
    /// If `handle` is unknown or was already deleted.
    pub fn delete_array(&mut self, handle: ArrayHandle) {
        let record = self
            .arrays
            .records
            .remove(&handle)
            .unwrap_or_else(|| panic!("delete of unknown or deleted {handle}"));

        self.backend.delete_buffer(record.vertex_buffer);
        self.backend.delete_buffer(record.index_buffer);

        // Deleted buffers are unbound by the backend.
        if self.bind.array == Some(handle) {
            self.bind.array = None;
        }
        log::debug!("deleted {handle}");
    }

    /// Writes `count` vertices starting at vertex `first`.
    ///
    /// `vertices` is reinterpreted as raw bytes and must hold at least
    /// `count × stride` bytes.
    ///
    /// # Panics
    /// If `vertices` is empty, `count` is zero, or `first + count` exceeds the
    /// array's vertex capacity.
    pub fn set_vertex_data<V: Pod>(
        &mut self,
        handle: ArrayHandle,
        vertices: &[V],
        first: u32,
        count: u32,
    ) {
        assert!(!vertices.is_empty(), "set_vertex_data on {handle} without data");
        assert!(count > 0, "set_vertex_data on {handle} with zero count");

        let record = self.arrays.get(handle);
        assert!(
            u64::from(first) + u64::from(count) <= u64::from(record.max_vertices),
            "vertex write {first}..{} exceeds capacity {} of {handle}",
            u64::from(first) + u64::from(count),
            record.max_vertices
        );

        let stride = record.layout.stride() as usize;
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let len = stride * count as usize;
        assert!(
            bytes.len() >= len,
            "{count} vertices of {stride} bytes need {len} bytes, got {}",
            bytes.len()
        );

        self.bind_array(handle);
        self.backend
            .write_buffer(BufferTarget::Vertex, stride * first as usize, &bytes[..len]);
    }

    /// Writes `count` index triples starting at triangle `first`.
    ///
    /// `indices` must hold at least `3 × count` entries.
    ///
    /// # Panics
    /// If `indices` is empty, `count` is zero, or `first + count` exceeds the
    /// array's triangle capacity.
    pub fn set_index_data(&mut self, handle: ArrayHandle, indices: &[u32], first: u32, count: u32) {
        assert!(!indices.is_empty(), "set_index_data on {handle} without data");
        assert!(count > 0, "set_index_data on {handle} with zero count");

        let record = self.arrays.get(handle);
        assert!(
            u64::from(first) + u64::from(count) <= u64::from(record.max_triangles),
            "triangle write {first}..{} exceeds capacity {} of {handle}",
            u64::from(first) + u64::from(count),
            record.max_triangles
        );

        let len = 3 * count as usize;
        assert!(
            indices.len() >= len,
            "{count} triangles need {len} indices, got {}",
            indices.len()
        );
        let indices = &indices[..len];
        debug_assert!(
            indices.iter().all(|&i| i < record.max_vertices),
            "index data for {handle} references a vertex beyond capacity {}",
            record.max_vertices
        );

        self.bind_array(handle);
        self.backend.write_buffer(
            BufferTarget::Index,
            TRIANGLE_INDEX_BYTES * first as usize,
            bytemuck::cast_slice(indices),
        );
    }

    /// Layout the array was created with.
    pub fn array_layout(&self, handle: ArrayHandle) -> &VertexLayout {
        &self.arrays.get(handle).layout
    }

    /// `(max_vertices, max_triangles)` of the array.
    pub fn array_capacity(&self, handle: ArrayHandle) -> (u32, u32) {
        let record = self.arrays.get(handle);
        (record.max_vertices, record.max_triangles)
    }

    /// Number of live arrays.
    pub fn array_count(&self) -> usize {
        self.arrays.len()
    }

    fn allocate(
        &mut self,
        target: BufferTarget,
        buffer: BufferId,
        size: usize,
        usage: BufferUsage,
    ) -> std::result::Result<(), BackendError> {
        self.backend.bind_buffer(target, Some(buffer));
        self.backend.allocate_buffer(target, size, usage)
    }

    /// Makes `handle` the bound array unless it already is.
    pub(super) fn bind_array(&mut self, handle: ArrayHandle) {
        if self.bind.array == Some(handle) {
            return;
        }
        let record = self.arrays.get(handle);
        self.backend
            .bind_buffer(BufferTarget::Vertex, Some(record.vertex_buffer));
        self.backend
            .bind_buffer(BufferTarget::Index, Some(record.index_buffer));
        self.bind.array = Some(handle);
    }
}
