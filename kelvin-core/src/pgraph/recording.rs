//! A rendering backend that draws nothing and records every call it receives.
//!
//! Surfaces keep the bytes last written to them so readbacks return what the
//! engine uploaded. Cloning the backend shares the recorded log, which lets a
//! test keep a handle after moving the backend into the engine.

use std::ops::Range;
use std::sync::{Arc, Mutex, PoisonError};

use super::backend::{
    AttributeFormat, AttributeSource, ClearParams, Draw, PrimitiveMode, ProgramId, QueryId, Rect,
    RenderBackend, RenderState, SamplerState, SurfaceFormat, SurfaceKind, TextureDesc, TextureId,
    TextureLevel, UniformLocation, UniformValue,
};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedAttribute {
    Constant([f32; 4]),
    Data {
        format: AttributeFormat,
        len: usize,
        stride: u32,
    },
    Inline(Vec<[f32; 4]>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedDraw {
    Ranges(Vec<Range<u32>>),
    Indexed { indices: Vec<u32>, min: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    CreateSurface {
        kind: SurfaceKind,
        format: SurfaceFormat,
        width: u32,
        height: u32,
    },
    DestroySurface(SurfaceKind),
    WriteSurface {
        kind: SurfaceKind,
        len: usize,
    },
    ReadSurface {
        kind: SurfaceKind,
        len: usize,
    },
    SetRenderState(RenderState),
    SetViewport(Rect),
    SetScissor(Option<Rect>),
    Clear(ClearParams),
    CreateTexture {
        id: TextureId,
        desc: TextureDesc,
        levels: usize,
    },
    DestroyTexture(TextureId),
    BindTexture {
        unit: u32,
        texture: Option<TextureId>,
        sampler: SamplerState,
    },
    CreateProgram {
        id: ProgramId,
        vertex_source: String,
        fragment_source: String,
    },
    BindProgram(ProgramId),
    SetUniform {
        name: String,
        value: UniformValue,
    },
    BindVertexAttribute {
        index: u32,
        source: RecordedAttribute,
    },
    Draw {
        mode: PrimitiveMode,
        draw: RecordedDraw,
    },
    BeginOcclusionQuery(QueryId),
    EndOcclusionQuery(QueryId),
    DeleteQuery(QueryId),
}

#[derive(Default)]
struct Recording {
    commands: Vec<BackendCommand>,
    color: Vec<u8>,
    zeta: Vec<u8>,
    uniform_names: Vec<String>,
    next_id: u32,
    query_result: u32,
    textures_alive: usize,
}

impl Recording {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn surface(&mut self, kind: SurfaceKind) -> &mut Vec<u8> {
        match kind {
            SurfaceKind::Color => &mut self.color,
            SurfaceKind::Zeta => &mut self.zeta,
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingBackend {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, command: BackendCommand) {
        log::trace!("backend: {:?}", command);
        self.lock().commands.push(command);
    }

    pub fn commands(&self) -> Vec<BackendCommand> {
        self.lock().commands.clone()
    }

    pub fn take_commands(&self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.lock().commands)
    }

    pub fn draws(&self) -> Vec<(PrimitiveMode, RecordedDraw)> {
        self.lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                BackendCommand::Draw { mode, draw } => Some((*mode, draw.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, filter: impl Fn(&BackendCommand) -> bool) -> usize {
        self.lock().commands.iter().filter(|c| filter(c)).count()
    }

    /// Pixel count every occlusion query reports
    pub fn set_query_result(&self, result: u32) {
        self.lock().query_result = result;
    }

    /// Replaces the backend side content of a surface, as if rendered to
    pub fn fill_surface(&self, kind: SurfaceKind, data: &[u8]) {
        let mut inner = self.lock();
        let surface = inner.surface(kind);
        surface.clear();
        surface.extend_from_slice(data);
    }

    pub fn surface_data(&self, kind: SurfaceKind) -> Vec<u8> {
        self.lock().surface(kind).clone()
    }

    pub fn textures_alive(&self) -> usize {
        self.lock().textures_alive
    }
}

impl RenderBackend for RecordingBackend {
    fn create_surface(&mut self, kind: SurfaceKind, format: SurfaceFormat, width: u32, height: u32) {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        *self.lock().surface(kind) = vec![0; len];
        self.record(BackendCommand::CreateSurface {
            kind,
            format,
            width,
            height,
        });
    }

    fn destroy_surface(&mut self, kind: SurfaceKind) {
        self.lock().surface(kind).clear();
        self.record(BackendCommand::DestroySurface(kind));
    }

    fn write_surface(&mut self, kind: SurfaceKind, data: &[u8]) {
        {
            let mut inner = self.lock();
            let surface = inner.surface(kind);
            surface.clear();
            surface.extend_from_slice(data);
        }
        self.record(BackendCommand::WriteSurface {
            kind,
            len: data.len(),
        });
    }

    fn read_surface(&mut self, kind: SurfaceKind, data: &mut [u8]) {
        {
            let mut inner = self.lock();
            let surface = inner.surface(kind);
            let len = surface.len().min(data.len());
            data[..len].copy_from_slice(&surface[..len]);
            data[len..].fill(0);
        }
        self.record(BackendCommand::ReadSurface {
            kind,
            len: data.len(),
        });
    }

    fn set_render_state(&mut self, state: &RenderState) {
        self.record(BackendCommand::SetRenderState(*state));
    }

    fn set_viewport(&mut self, viewport: Rect) {
        self.record(BackendCommand::SetViewport(viewport));
    }

    fn set_scissor(&mut self, scissor: Option<Rect>) {
        self.record(BackendCommand::SetScissor(scissor));
    }

    fn clear(&mut self, params: &ClearParams) {
        self.record(BackendCommand::Clear(*params));
    }

    fn create_texture(&mut self, desc: &TextureDesc, levels: Vec<TextureLevel>) -> TextureId {
        let id = {
            let mut inner = self.lock();
            inner.textures_alive += 1;
            TextureId(inner.next_id())
        };
        self.record(BackendCommand::CreateTexture {
            id,
            desc: *desc,
            levels: levels.len(),
        });
        id
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.lock().textures_alive -= 1;
        self.record(BackendCommand::DestroyTexture(texture));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>, sampler: &SamplerState) {
        self.record(BackendCommand::BindTexture {
            unit,
            texture,
            sampler: *sampler,
        });
    }

    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> ProgramId {
        let id = ProgramId(self.lock().next_id());
        self.record(BackendCommand::CreateProgram {
            id,
            vertex_source: vertex_source.to_owned(),
            fragment_source: fragment_source.to_owned(),
        });
        id
    }

    fn bind_program(&mut self, program: ProgramId) {
        self.record(BackendCommand::BindProgram(program));
    }

    fn uniform_location(&mut self, _program: ProgramId, name: &str) -> Option<UniformLocation> {
        let mut inner = self.lock();
        let index = match inner.uniform_names.iter().position(|n| n == name) {
            Some(index) => index,
            None => {
                inner.uniform_names.push(name.to_owned());
                inner.uniform_names.len() - 1
            }
        };
        Some(UniformLocation(index as u32))
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let name = self
            .lock()
            .uniform_names
            .get(location.0 as usize)
            .cloned()
            .unwrap_or_default();
        self.record(BackendCommand::SetUniform { name, value });
    }

    fn bind_vertex_attribute(&mut self, index: u32, source: AttributeSource) {
        let source = match source {
            AttributeSource::Constant(value) => RecordedAttribute::Constant(value),
            AttributeSource::Data {
                format,
                bytes,
                stride,
            } => RecordedAttribute::Data {
                format,
                len: bytes.len(),
                stride,
            },
            AttributeSource::Inline(values) => RecordedAttribute::Inline(values.to_vec()),
        };
        self.record(BackendCommand::BindVertexAttribute { index, source });
    }

    fn draw(&mut self, mode: PrimitiveMode, draw: &Draw) {
        let draw = match *draw {
            Draw::Ranges(ranges) => RecordedDraw::Ranges(ranges.to_vec()),
            Draw::Indexed { indices, min, max } => RecordedDraw::Indexed {
                indices: indices.to_vec(),
                min,
                max,
            },
        };
        self.record(BackendCommand::Draw { mode, draw });
    }

    fn begin_occlusion_query(&mut self) -> QueryId {
        let id = QueryId(self.lock().next_id());
        self.record(BackendCommand::BeginOcclusionQuery(id));
        id
    }

    fn end_occlusion_query(&mut self, query: QueryId) {
        self.record(BackendCommand::EndOcclusionQuery(query));
    }

    fn query_result(&mut self, _query: QueryId) -> u32 {
        self.lock().query_result
    }

    fn delete_query(&mut self, query: QueryId) {
        self.record(BackendCommand::DeleteQuery(query));
    }
}
