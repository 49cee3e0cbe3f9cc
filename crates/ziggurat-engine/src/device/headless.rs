use std::collections::HashMap;
use std::num::NonZeroU32;

use super::{
    AttributePointer, BackendError, BufferId, BufferTarget, BufferUsage, GraphicsBackend,
    ProgramAttribute, ProgramId, SamplerDesc, TextureId, VertexArrayId,
};

/// One call received by a [`HeadlessBackend`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateBuffer(BufferId),
    DeleteBuffer(BufferId),
    BindBuffer(BufferTarget, Option<BufferId>),
    AllocateBuffer { target: BufferTarget, size: usize, usage: BufferUsage },
    WriteBuffer { target: BufferTarget, offset: usize, len: usize },
    CreateVertexArray(VertexArrayId),
    BindVertexArray(Option<VertexArrayId>),
    DeleteVertexArray(VertexArrayId),
    EnableAttribute(u32),
    DisableAttribute(u32),
    FloatAttributePointer(u32, AttributePointer),
    IntegerAttributePointer(u32, AttributePointer),
    UseProgram(Option<ProgramId>),
    CreateTexture { texture: TextureId, width: u32, height: u32, sampler: SamplerDesc },
    BindTexture { slot: u32, texture: Option<TextureId> },
    DeleteTexture(TextureId),
    SetBlending(bool),
    DrawIndexedTriangles(u32),
    Clear([f32; 4]),
    Present,
    Resize(u32, u32),
}

/// GPU-free backend that records every call and simulates buffer storage.
///
/// Programs are registered up front with [`add_program`](Self::add_program);
/// their attribute maps are what [`GraphicsBackend::program_attributes`]
/// reports. Buffer writes land in host memory so uploaded bytes can be
/// inspected with [`buffer_bytes`](Self::buffer_bytes).
#[derive(Debug)]
pub struct HeadlessBackend {
    calls: Vec<BackendCall>,
    next_name: u32,
    max_texture_slots: u32,
    max_texture_units: u32,

    bound: HashMap<BufferTarget, BufferId>,
    buffers: HashMap<BufferId, Vec<u8>>,
    programs: HashMap<ProgramId, Vec<ProgramAttribute>>,

    refuse_creation: bool,
    max_buffer_size: usize,
    validation_logs: HashMap<ProgramId, String>,
    validated: Vec<ProgramId>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_texture_slots(16)
    }

    /// Creates a backend that reports `slots` texture slots.
    pub fn with_texture_slots(slots: u32) -> Self {
        Self {
            calls: Vec::new(),
            next_name: 1,
            max_texture_slots: slots,
            max_texture_units: slots * 2,
            bound: HashMap::new(),
            buffers: HashMap::new(),
            programs: HashMap::new(),
            refuse_creation: false,
            max_buffer_size: usize::MAX,
            validation_logs: HashMap::new(),
            validated: Vec::new(),
        }
    }

    /// Registers a linked program exposing `attributes`.
    pub fn add_program(&mut self, attributes: Vec<ProgramAttribute>) -> ProgramId {
        let id = ProgramId(self.allocate_name());
        self.programs.insert(id, attributes);
        id
    }

    /// Makes every subsequent resource creation fail.
    pub fn refuse_creation(&mut self, refuse: bool) {
        self.refuse_creation = refuse;
    }

    /// Makes allocations larger than `bytes` fail.
    pub fn set_max_buffer_size(&mut self, bytes: usize) {
        self.max_buffer_size = bytes;
    }

    /// Makes validation of `program` fail with `log`.
    pub fn fail_validation(&mut self, program: ProgramId, log: impl Into<String>) {
        self.validation_logs.insert(program, log.into());
    }

    /// Programs validated so far, in order. Validation is not part of
    /// [`calls`](Self::calls).
    pub fn validated_programs(&self) -> &[ProgramId] {
        &self.validated
    }

    /// Calls received so far.
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Drains the call log.
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// Contents of a live buffer.
    pub fn buffer_bytes(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Returns `true` while `buffer` has not been deleted.
    pub fn is_buffer_live(&self, buffer: BufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }

    fn allocate_name(&mut self) -> NonZeroU32 {
        let name = NonZeroU32::new(self.next_name).unwrap_or(NonZeroU32::MIN);
        self.next_name += 1;
        name
    }

    fn check_creation(&self) -> Result<(), BackendError> {
        if self.refuse_creation {
            return Err(BackendError::new("resource creation refused"));
        }
        Ok(())
    }

    fn bound_storage(&mut self, target: BufferTarget) -> &mut Vec<u8> {
        let id = self
            .bound
            .get(&target)
            .copied()
            .unwrap_or_else(|| panic!("no buffer bound to {target:?}"));
        self.buffers
            .get_mut(&id)
            .unwrap_or_else(|| panic!("buffer {id:?} bound to {target:?} was deleted"))
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn create_buffer(&mut self) -> Result<BufferId, BackendError> {
        self.check_creation()?;
        let id = BufferId(self.allocate_name());
        self.buffers.insert(id, Vec::new());
        self.calls.push(BackendCall::CreateBuffer(id));
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.bound.retain(|_, b| *b != buffer);
        self.calls.push(BackendCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        match buffer {
            Some(b) => self.bound.insert(target, b),
            None => self.bound.remove(&target),
        };
        self.calls.push(BackendCall::BindBuffer(target, buffer));
    }

    fn allocate_buffer(
        &mut self,
        target: BufferTarget,
        size: usize,
        usage: BufferUsage,
    ) -> Result<(), BackendError> {
        self.calls.push(BackendCall::AllocateBuffer { target, size, usage });
        if size > self.max_buffer_size {
            return Err(BackendError::new(format!(
                "{size} byte buffer exceeds the {} byte limit",
                self.max_buffer_size
            )));
        }
        *self.bound_storage(target) = vec![0; size];
        Ok(())
    }

    fn write_buffer(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        let storage = self.bound_storage(target);
        let end = offset + data.len();
        assert!(
            end <= storage.len(),
            "write of {} bytes at {offset} overruns {} byte buffer",
            data.len(),
            storage.len()
        );
        storage[offset..end].copy_from_slice(data);
        self.calls.push(BackendCall::WriteBuffer {
            target,
            offset,
            len: data.len(),
        });
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, BackendError> {
        self.check_creation()?;
        let id = VertexArrayId(self.allocate_name());
        self.calls.push(BackendCall::CreateVertexArray(id));
        Ok(id)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.calls.push(BackendCall::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.calls.push(BackendCall::DeleteVertexArray(vertex_array));
    }

    fn enable_attribute(&mut self, slot: u32) {
        self.calls.push(BackendCall::EnableAttribute(slot));
    }

    fn disable_attribute(&mut self, slot: u32) {
        self.calls.push(BackendCall::DisableAttribute(slot));
    }

    fn float_attribute_pointer(&mut self, slot: u32, pointer: AttributePointer) {
        self.calls.push(BackendCall::FloatAttributePointer(slot, pointer));
    }

    fn integer_attribute_pointer(&mut self, slot: u32, pointer: AttributePointer) {
        self.calls.push(BackendCall::IntegerAttributePointer(slot, pointer));
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.calls.push(BackendCall::UseProgram(program));
    }

    fn program_attributes(&mut self, program: ProgramId) -> Vec<ProgramAttribute> {
        self.programs.get(&program).cloned().unwrap_or_default()
    }

    fn validate_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        self.validated.push(program);
        match self.validation_logs.get(&program) {
            Some(log) => Err(BackendError::new(log.clone())),
            None => Ok(()),
        }
    }

    fn max_texture_slots(&self) -> u32 {
        self.max_texture_slots
    }

    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
        sampler: SamplerDesc,
    ) -> Result<TextureId, BackendError> {
        self.check_creation()?;
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(BackendError::new(format!(
                "{width}x{height} RGBA8 texture needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        let texture = TextureId(self.allocate_name());
        self.calls.push(BackendCall::CreateTexture {
            texture,
            width,
            height,
            sampler,
        });
        Ok(texture)
    }

    fn bind_texture(&mut self, slot: u32, texture: Option<TextureId>) {
        self.calls.push(BackendCall::BindTexture { slot, texture });
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.calls.push(BackendCall::DeleteTexture(texture));
    }

    fn set_blending(&mut self, enabled: bool) {
        self.calls.push(BackendCall::SetBlending(enabled));
    }

    fn draw_indexed_triangles(&mut self, index_count: u32) {
        self.calls.push(BackendCall::DrawIndexedTriangles(index_count));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(BackendCall::Clear(color));
    }

    fn present(&mut self) -> Result<(), BackendError> {
        self.calls.push(BackendCall::Present);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.calls.push(BackendCall::Resize(width, height));
    }
}
