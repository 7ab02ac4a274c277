//! Vertex attribute state and the per-primitive vertex batch.
//!
//! Between BEGIN and END vertices arrive in exactly one of four ways:
//! ranges of the vertex arrays, immediate attribute writes, a raw inline
//! array of interleaved attributes, or a list of indices.

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

use super::backend::{AttributeFormat, AttributeKind, AttributeSource, Draw};
use super::dispatch::{MethodAction, MethodCall};
use super::methods::*;
use super::regs::get_mask;
use super::PgraphState;
use crate::memory::dma::DmaObject;

pub const MAX_VERTEX_ATTRIBUTES: usize = 16;
pub const VERTEX_ATTR_POSITION: usize = 0;

#[derive(Debug, Clone)]
pub struct VertexAttribute {
    /// `SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_*`
    pub format: u32,
    /// components per vertex, 0 when the array is disabled
    pub count: u32,
    pub stride: u32,
    /// bytes per component
    pub size: u32,

    pub dma_select: bool,
    pub offset: u32,

    /// packed 11/11/10 normals are expanded to floats before drawing
    pub needs_conversion: bool,
    converted: Vec<u8>,
    converted_elements: u32,

    /// value used when the attribute has no array, and the last immediate write
    pub inline_value: [f32; 4],
    inline_buffer: Option<Vec<[f32; 4]>>,
    inline_array_offset: u32,
}

impl Default for VertexAttribute {
    fn default() -> Self {
        Self {
            format: SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_F,
            count: 0,
            stride: 0,
            size: 4,
            dma_select: false,
            offset: 0,
            needs_conversion: false,
            converted: Vec::new(),
            converted_elements: 0,
            inline_value: [0.0, 0.0, 0.0, 1.0],
            inline_buffer: None,
            inline_array_offset: 0,
        }
    }
}

impl VertexAttribute {
    fn host_format(&self) -> AttributeFormat {
        let (kind, normalized, bgra) = match self.format {
            SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_UB_D3D => (AttributeKind::UnsignedByte, true, true),
            SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_UB_OGL => (AttributeKind::UnsignedByte, true, false),
            SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_S1 => (AttributeKind::Short, true, false),
            SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_S32K => (AttributeKind::Short, false, false),
            SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_F => (AttributeKind::Float, false, false),
            SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_CMP => {
                return AttributeFormat {
                    kind: AttributeKind::Float,
                    count: self.count * 3,
                    normalized: false,
                    bgra: false,
                }
            }
            format => unreachable!("vertex format {} accepted by the format method", format),
        };
        AttributeFormat {
            kind,
            count: self.count,
            normalized,
            bgra,
        }
    }

    /// Expands packed normals of elements not converted yet
    fn convert(&mut self, data: &[u8], in_stride: usize, num_elements: u32) {
        let out_stride = self.count as usize * 3 * 4;
        if num_elements > self.converted_elements {
            self.converted.resize(num_elements as usize * out_stride, 0);
        }

        for element in self.converted_elements..num_elements {
            let element = element as usize;
            for component in 0..self.count as usize {
                let p = LittleEndian::read_u32(&data[element * in_stride + component * 4..]);
                let xyz = [
                    ((((p & 0x7FF) << 21) as i32) >> 21) as f32 / 1023.0,
                    (((((p >> 11) & 0x7FF) << 21) as i32) >> 21) as f32 / 1023.0,
                    (((((p >> 22) & 0x3FF) << 22) as i32) >> 22) as f32 / 511.0,
                ];
                let out = element * out_stride + component * 12;
                LittleEndian::write_f32_into(&xyz, &mut self.converted[out..out + 12]);
            }
        }
        self.converted_elements = num_elements;
    }
}

/// Vertices collected between BEGIN and END
#[derive(Debug, Default)]
pub struct Batch {
    pub draw_arrays: Vec<Range<u32>>,
    pub draw_arrays_max_count: u32,
    pub inline_buffer_length: u32,
    pub inline_array: Vec<u32>,
    pub inline_elements: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchMode {
    DrawArrays,
    InlineBuffer,
    InlineArray,
    InlineElements,
}

impl Batch {
    fn populated(&self) -> Option<BatchMode> {
        if !self.draw_arrays.is_empty() {
            Some(BatchMode::DrawArrays)
        } else if self.inline_buffer_length > 0 {
            Some(BatchMode::InlineBuffer)
        } else if !self.inline_array.is_empty() {
            Some(BatchMode::InlineArray)
        } else if !self.inline_elements.is_empty() {
            Some(BatchMode::InlineElements)
        } else {
            None
        }
    }

    fn expect_mode(&self, mode: BatchMode) {
        if let Some(populated) = self.populated() {
            assert_eq!(
                populated, mode,
                "vertices submitted as {:?} into a {:?} batch",
                mode, populated
            );
        }
    }
}

pub struct Vertices {
    pub attributes: [VertexAttribute; MAX_VERTEX_ATTRIBUTES],
    pub batch: Batch,
}

impl Default for Vertices {
    fn default() -> Self {
        Self {
            attributes: std::array::from_fn(|_| VertexAttribute::default()),
            batch: Batch::default(),
        }
    }
}

impl PgraphState {
    pub(super) fn reset_batch(&mut self) {
        self.vertices.batch = Batch::default();
        for attribute in &mut self.vertices.attributes {
            attribute.inline_buffer = None;
        }
    }

    fn check_batch_length(&self, length: usize) {
        assert!(
            length < self.config.max_batch_length,
            "vertex batch longer than {}",
            self.config.max_batch_length
        );
    }

    /// Starts recording `attr` per vertex once the batch has vertices,
    /// backfilling the vertices so far with its current value
    fn allocate_inline_buffer_vertices(&mut self, attr: usize) {
        let length = self.vertices.batch.inline_buffer_length as usize;
        let attribute = &mut self.vertices.attributes[attr];
        if attribute.inline_buffer.is_some() || length == 0 {
            return;
        }
        attribute.inline_buffer = Some(vec![attribute.inline_value; length]);
    }

    fn finish_inline_buffer_vertex(&mut self) {
        self.vertices.batch.expect_mode(BatchMode::InlineBuffer);
        self.check_batch_length(self.vertices.batch.inline_buffer_length as usize);

        for attribute in &mut self.vertices.attributes {
            if let Some(buffer) = &mut attribute.inline_buffer {
                buffer.push(attribute.inline_value);
            }
        }
        self.vertices.batch.inline_buffer_length += 1;
    }

    fn set_inline_value(&mut self, attr: usize, part: usize, value: f32) {
        self.allocate_inline_buffer_vertices(attr);
        self.vertices.attributes[attr].inline_value[part] = value;
    }

    /// Binds every attribute for `num_elements` vertices, reading arrays from
    /// the inline array words when `inline` is given.
    fn bind_vertex_attributes(&mut self, num_elements: u32, inline: Option<(&[u8], u32)>) {
        let vram_len = self.memory.vram().len();
        for (index, attribute) in self.vertices.attributes.iter_mut().enumerate() {
            if attribute.count == 0 {
                self.backend
                    .bind_vertex_attribute(index as u32, AttributeSource::Constant(attribute.inline_value));
                continue;
            }

            let element_size = (attribute.count * attribute.size) as usize;

            let (data, in_stride): (&[u8], u32) = match inline {
                Some((words, vertex_size)) => {
                    (&words[attribute.inline_array_offset as usize..], vertex_size)
                }
                None => {
                    let handle = if attribute.dma_select {
                        self.dma.vertex_b
                    } else {
                        self.dma.vertex_a
                    };
                    let (start, dma_len) =
                        DmaObject::load(self.memory.ramin(), handle).map(vram_len);
                    let offset = attribute.offset as usize;
                    assert!(
                        offset < dma_len,
                        "vertex attribute {} offset {:X} beyond DMA length {:X}",
                        index,
                        offset,
                        dma_len
                    );
                    let needed = match num_elements {
                        0 => 0,
                        n => (n as usize - 1) * attribute.stride as usize + element_size,
                    };
                    assert!(
                        offset + needed <= dma_len,
                        "vertex attribute {} data {:X}+{:X} beyond DMA length {:X}",
                        index,
                        offset,
                        needed,
                        dma_len
                    );
                    (
                        &self.memory.vram()[start + offset..start + offset + needed],
                        attribute.stride,
                    )
                }
            };

            if attribute.needs_conversion {
                attribute.convert(data, in_stride as usize, num_elements);
                self.backend.bind_vertex_attribute(
                    index as u32,
                    AttributeSource::Data {
                        format: attribute.host_format(),
                        bytes: &attribute.converted,
                        stride: attribute.count * 3 * 4,
                    },
                );
            } else {
                self.backend.bind_vertex_attribute(
                    index as u32,
                    AttributeSource::Data {
                        format: attribute.host_format(),
                        bytes: data,
                        stride: in_stride,
                    },
                );
            }
        }
    }

    /// Turns the batch into a single backend draw
    pub(super) fn flush_batch(&mut self) {
        let mode = match self.primitive_mode {
            Some(mode) => mode,
            None => panic!("END without BEGIN"),
        };
        let batch = std::mem::take(&mut self.vertices.batch);

        match batch.populated() {
            Some(BatchMode::DrawArrays) => {
                log::trace!("draw arrays {:?}", batch.draw_arrays);
                self.bind_vertex_attributes(batch.draw_arrays_max_count, None);
                self.backend.draw(mode, &Draw::Ranges(&batch.draw_arrays));
            }
            Some(BatchMode::InlineBuffer) => {
                log::trace!("draw inline buffer of {}", batch.inline_buffer_length);
                for (index, attribute) in self.vertices.attributes.iter_mut().enumerate() {
                    match attribute.inline_buffer.take() {
                        Some(buffer) => self
                            .backend
                            .bind_vertex_attribute(index as u32, AttributeSource::Inline(&buffer)),
                        None => self.backend.bind_vertex_attribute(
                            index as u32,
                            AttributeSource::Constant(attribute.inline_value),
                        ),
                    }
                }
                self.backend
                    .draw(mode, &Draw::Ranges(&[0..batch.inline_buffer_length]));
            }
            Some(BatchMode::InlineArray) => {
                let mut offset = 0;
                for attribute in &mut self.vertices.attributes {
                    if attribute.count > 0 {
                        attribute.inline_array_offset = offset;
                        offset += attribute.size * attribute.count;
                        assert!(offset % 4 == 0, "inline array attribute not word aligned");
                    }
                }
                let vertex_size = offset;
                assert!(vertex_size > 0, "inline array without enabled attributes");
                let index_count = batch.inline_array.len() as u32 * 4 / vertex_size;
                log::trace!("draw inline array {} x {}", index_count, vertex_size);

                let mut words = vec![0; batch.inline_array.len() * 4];
                LittleEndian::write_u32_into(&batch.inline_array, &mut words);
                self.bind_vertex_attributes(index_count, Some((&words, vertex_size)));
                self.backend.draw(mode, &Draw::Ranges(&[0..index_count]));
            }
            Some(BatchMode::InlineElements) => {
                let indices = &batch.inline_elements[..];
                let min = indices.iter().copied().min().unwrap_or(0);
                let max = indices.iter().copied().max().unwrap_or(0);
                log::trace!("draw {} inline elements {}..={}", indices.len(), min, max);

                self.bind_vertex_attributes(max + 1, None);
                self.backend.draw(mode, &Draw::Indexed { indices, min, max });
            }
            None => log::warn!("END of an empty {:?} primitive, nothing drawn", mode),
        }
    }
}

// method handlers

pub(super) fn set_vertex3f(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.set_inline_value(VERTEX_ATTR_POSITION, call.slot, f32::from_bits(call.parameter));
    pg.vertices.attributes[VERTEX_ATTR_POSITION].inline_value[3] = 1.0;
    if call.slot == 2 {
        pg.finish_inline_buffer_vertex();
    }
    MethodAction::Continue
}

pub(super) fn set_vertex4f(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.set_inline_value(VERTEX_ATTR_POSITION, call.slot, f32::from_bits(call.parameter));
    if call.slot == 3 {
        pg.finish_inline_buffer_vertex();
    }
    MethodAction::Continue
}

pub(super) fn set_vertex_data2f_m(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let (attr, part) = (call.slot / 2, call.slot % 2);
    pg.set_inline_value(attr, part, f32::from_bits(call.parameter));
    let value = &mut pg.vertices.attributes[attr].inline_value;
    value[2] = 0.0;
    value[3] = 1.0;
    if attr == VERTEX_ATTR_POSITION && part == 1 {
        pg.finish_inline_buffer_vertex();
    }
    MethodAction::Continue
}

pub(super) fn set_vertex_data4f_m(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let (attr, part) = (call.slot / 4, call.slot % 4);
    pg.set_inline_value(attr, part, f32::from_bits(call.parameter));
    if attr == VERTEX_ATTR_POSITION && part == 3 {
        pg.finish_inline_buffer_vertex();
    }
    MethodAction::Continue
}

pub(super) fn set_vertex_data2s(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let attr = call.slot;
    let p = call.parameter;
    pg.set_inline_value(attr, 0, (p & 0xFFFF) as i16 as f32);
    pg.vertices.attributes[attr].inline_value[1..].copy_from_slice(&[(p >> 16) as i16 as f32, 0.0, 1.0]);
    if attr == VERTEX_ATTR_POSITION {
        log::warn!("SET_VERTEX_DATA2S position vertices are unverified");
        pg.finish_inline_buffer_vertex();
    }
    MethodAction::Continue
}

pub(super) fn set_vertex_data4ub(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let attr = call.slot;
    let p = call.parameter;
    pg.set_inline_value(attr, 0, (p & 0xFF) as f32 / 255.0);
    pg.vertices.attributes[attr].inline_value[1..].copy_from_slice(&[
        ((p >> 8) & 0xFF) as f32 / 255.0,
        ((p >> 16) & 0xFF) as f32 / 255.0,
        ((p >> 24) & 0xFF) as f32 / 255.0,
    ]);
    if attr == VERTEX_ATTR_POSITION {
        log::warn!("SET_VERTEX_DATA4UB position vertices are unverified");
        pg.finish_inline_buffer_vertex();
    }
    MethodAction::Continue
}

pub(super) fn set_vertex_data4s_m(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let (attr, part) = (call.slot / 2, call.slot % 2);
    let p = call.parameter;
    log::warn!("SET_VERTEX_DATA4S_M attribute {} is unverified", attr);
    // maps [-32768, 32767] to [-1, 1]
    let low = ((p & 0xFFFF) as i16 as f32 * 2.0 + 1.0) / 65535.0;
    let high = ((p >> 16) as i16 as f32 * 2.0 + 1.0) / 65535.0;
    pg.set_inline_value(attr, part * 2, low);
    pg.vertices.attributes[attr].inline_value[part * 2 + 1] = high;
    if attr == VERTEX_ATTR_POSITION && part == 1 {
        pg.finish_inline_buffer_vertex();
    }
    MethodAction::Continue
}

pub(super) fn set_vertex_data_array_format(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    let p = call.parameter;
    let attribute = &mut pg.vertices.attributes[call.slot];
    attribute.format = get_mask(p, SET_VERTEX_DATA_ARRAY_FORMAT_TYPE);
    attribute.count = get_mask(p, SET_VERTEX_DATA_ARRAY_FORMAT_SIZE);
    attribute.stride = get_mask(p, SET_VERTEX_DATA_ARRAY_FORMAT_STRIDE);

    attribute.needs_conversion = false;
    attribute.size = match attribute.format {
        SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_UB_D3D => {
            assert_eq!(attribute.count, 4, "D3D color attribute must have 4 components");
            1
        }
        SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_UB_OGL => 1,
        SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_S1 | SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_S32K => 2,
        SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_F => 4,
        SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_CMP => {
            attribute.needs_conversion = true;
            4
        }
        format => panic!("unknown vertex data array type 0x{:X}", format),
    };

    attribute.converted_elements = 0;
    if !attribute.needs_conversion {
        attribute.converted = Vec::new();
    }
    MethodAction::Continue
}

pub(super) fn set_vertex_data_array_offset(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    let attribute = &mut pg.vertices.attributes[call.slot];
    attribute.dma_select = call.parameter & 0x8000_0000 != 0;
    attribute.offset = call.parameter & 0x7FFF_FFFF;
    attribute.converted_elements = 0;
    MethodAction::Continue
}

pub(super) fn draw_arrays(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let start = get_mask(call.parameter, DRAW_ARRAYS_START_INDEX);
    let count = get_mask(call.parameter, DRAW_ARRAYS_COUNT) + 1;

    let batch = &pg.vertices.batch;
    batch.expect_mode(BatchMode::DrawArrays);
    pg.check_batch_length(batch.draw_arrays.len());

    let batch = &mut pg.vertices.batch;
    batch.draw_arrays_max_count = batch.draw_arrays_max_count.max(start + count);

    // connect with the previous range when contiguous
    if let Some(last) = batch.draw_arrays.last_mut() {
        if last.end == start {
            last.end += count;
            return MethodAction::Continue;
        }
    }
    batch.draw_arrays.push(start..start + count);
    MethodAction::Continue
}

pub(super) fn inline_array(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.vertices.batch.expect_mode(BatchMode::InlineArray);
    pg.check_batch_length(pg.vertices.batch.inline_array.len());
    pg.vertices.batch.inline_array.push(call.parameter);
    MethodAction::Continue
}

pub(super) fn array_element16(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.vertices.batch.expect_mode(BatchMode::InlineElements);
    pg.check_batch_length(pg.vertices.batch.inline_elements.len() + 1);
    let elements = &mut pg.vertices.batch.inline_elements;
    elements.push(call.parameter & 0xFFFF);
    elements.push(call.parameter >> 16);
    MethodAction::Continue
}

pub(super) fn array_element32(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.vertices.batch.expect_mode(BatchMode::InlineElements);
    pg.check_batch_length(pg.vertices.batch.inline_elements.len());
    pg.vertices.batch.inline_elements.push(call.parameter);
    MethodAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_mode_detection() {
        let mut batch = Batch::default();
        assert_eq!(batch.populated(), None);
        batch.inline_elements.push(3);
        assert_eq!(batch.populated(), Some(BatchMode::InlineElements));
        batch.expect_mode(BatchMode::InlineElements);
    }

    #[test]
    #[should_panic]
    fn mixing_batch_modes_panics() {
        let mut batch = Batch::default();
        batch.draw_arrays.push(0..3);
        batch.expect_mode(BatchMode::InlineArray);
    }

    #[test]
    fn compressed_normals_expand() {
        let mut attribute = VertexAttribute {
            format: SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_CMP,
            count: 1,
            size: 4,
            needs_conversion: true,
            ..Default::default()
        };
        // x = 1023, y = -1023 (0x401), z = 511
        let packed: u32 = 0x3FF | (0x401 << 11) | (0x1FF << 22);
        let mut data = [0; 8];
        LittleEndian::write_u32(&mut data, packed);
        attribute.convert(&data, 4, 1);

        let mut xyz = [0.0; 3];
        LittleEndian::read_f32_into(&attribute.converted[..12], &mut xyz);
        assert_eq!(xyz, [1.0, -1.0, 1.0]);

        // already converted elements are kept
        LittleEndian::write_u32(&mut data, 0);
        attribute.convert(&data, 4, 1);
        assert_eq!(&attribute.converted[..4], &1.0f32.to_le_bytes());
        assert_eq!(attribute.host_format().count, 3);
    }
}
