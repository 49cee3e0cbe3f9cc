use std::collections::HashMap;

use crate::device::{GraphicsBackend, ProgramAttribute, ProgramId};

use super::slots::SlotMask;
use super::{ArrayHandle, Graphics};

/// What the context currently has bound, as far as the core is concerned.
#[derive(Debug, Default)]
pub(crate) struct BindState {
    pub array: Option<ArrayHandle>,
    pub program: Option<ProgramId>,
    pub enabled: SlotMask,
}

/// Attribute inputs of one program, indexed by name.
#[derive(Debug)]
pub(crate) struct ProgramSlots {
    inputs: Vec<ProgramAttribute>,
    by_name: HashMap<String, usize>,
}

impl ProgramSlots {
    pub fn new(inputs: Vec<ProgramAttribute>) -> Self {
        let by_name = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| (input.name.clone(), i))
            .collect();
        Self { inputs, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&ProgramAttribute> {
        self.by_name.get(name).map(|&i| &self.inputs[i])
    }

    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    pub fn inputs(&self) -> &[ProgramAttribute] {
        &self.inputs
    }
}

impl<B: GraphicsBackend> Graphics<B> {
    /// Makes `program` the active program for subsequent draws.
    ///
    /// The program's attribute slots are queried once and cached until
    /// [`forget_program`](Self::forget_program).
    pub fn use_program(&mut self, program: Option<ProgramId>) {
        if let Some(p) = program {
            if !self.programs.contains_key(&p) {
                let inputs = self.backend.program_attributes(p);
                log::debug!("program {} exposes {} vertex inputs", p.get(), inputs.len());
                self.programs.insert(p, ProgramSlots::new(inputs));
            }
        }

        if self.bind.program != program {
            self.backend.use_program(program);
            self.bind.program = program;
        }
    }

    /// Drops the cached slot map of a program deleted by its owner.
    pub fn forget_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.bind.program == Some(program) {
            self.backend.use_program(None);
            self.bind.program = None;
        }
    }

    /// Currently active program.
    pub fn active_program(&self) -> Option<ProgramId> {
        self.bind.program
    }

    /// Draws every triangle the array can hold.
    pub fn draw_array(&mut self, handle: ArrayHandle) {
        let triangles = self.arrays.get(handle).max_triangles;
        self.draw_array_triangles(handle, triangles);
    }

    /// Draws the first `triangle_count` triangles of the array's index buffer
    /// with the active program.
    ///
    /// Array attributes are matched to program inputs by name on every draw;
    /// attributes the program does not declare are skipped. Only slots whose
    /// enabled state changes since the previous draw are toggled.
    ///
    /// # Panics
    /// If `handle` is unknown or `triangle_count` exceeds the array's capacity.
    pub fn draw_array_triangles(&mut self, handle: ArrayHandle, triangle_count: u32) {
        let max_triangles = self.arrays.get(handle).max_triangles;
        assert!(
            triangle_count <= max_triangles,
            "draw of {triangle_count} triangles exceeds capacity {max_triangles} of {handle}"
        );
        let index_count = triangle_count
            .checked_mul(3)
            .unwrap_or_else(|| panic!("draw of {triangle_count} triangles overflows the index count"));

        self.bind_array(handle);

        let record = self.arrays.get(handle);
        let program = self.bind.program.and_then(|p| self.programs.get(&p));
        let stride = record.layout.stride();
        let mut wanted = SlotMask::new();

        if let Some(slots) = program {
            for attribute in record.layout.attributes() {
                let Some(input) = slots.get(&attribute.name) else {
                    continue;
                };
                let slot = input.slot;

                if !self.bind.enabled.contains(slot) {
                    self.backend.enable_attribute(slot);
                }
                wanted.insert(slot);

                let pointer = attribute.pointer(stride);
                if attribute.ty.scalar().is_integer() {
                    self.backend.integer_attribute_pointer(slot, pointer);
                } else {
                    self.backend.float_attribute_pointer(slot, pointer);
                }
            }
        }

        for slot in self.bind.enabled.difference(&wanted) {
            self.backend.disable_attribute(slot);
        }

        #[cfg(debug_assertions)]
        {
            match (self.bind.program, program) {
                (Some(id), Some(slots)) => {
                    validate_inputs(handle, record, id, slots);
                    if let Err(e) = self.backend.validate_program(id) {
                        log::error!(
                            "program {} failed validation drawing {handle}: {}",
                            id.get(),
                            e.0
                        );
                    }
                }
                _ => log::warn!("drawing {handle} with no active program"),
            }
        }

        self.bind.enabled = wanted;
        self.backend.draw_indexed_triangles(index_count);
    }

    /// Number of attribute slots left enabled by the last draw.
    pub fn enabled_attribute_count(&self) -> usize {
        self.bind.enabled.len()
    }
}

/// Checks the program's inputs against what the draw just configured.
#[cfg(debug_assertions)]
fn validate_inputs(
    handle: ArrayHandle,
    record: &super::arrays::ArrayRecord,
    program: ProgramId,
    slots: &ProgramSlots,
) {
    for input in slots.inputs() {
        match record.layout.attribute(&input.name) {
            None => log::error!(
                "program {} input `{}` (slot {}) is unbound when drawing {handle}",
                program.get(),
                input.name,
                input.slot
            ),
            Some(attr) => {
                if let Some(declared) = input.ty.filter(|&t| t != attr.ty) {
                    log::error!(
                        "attribute mismatch on `{}` drawing {handle}: program {} declares {declared:?}, array holds {:?}",
                        input.name,
                        program.get(),
                        attr.ty
                    );
                }
            }
        }
    }
}
