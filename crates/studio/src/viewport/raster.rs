//! Software rasterizer used for headless rendering and clip capture.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use super::camera::OrbitCamera;
use super::{CapturedFrame, RenderSurface};
use crate::material::SurfaceMaterial;
use crate::state::scene::{Group, SolidMesh};

const AMBIENT: f32 = 0.25;
const NEAR_W: f32 = 1e-4;

#[derive(Clone, Copy, PartialEq)]
enum Pass {
    Opaque,
    Blended,
}

/// Z-buffered CPU renderer with a fixed key light
pub struct SoftwareSurface {
    width: u32,
    height: u32,
    camera: OrbitCamera,
    background: [u8; 3],
    light_dir: Vec3,
    color: Vec<Vec3>,
    depth: Vec<f32>,
    frames_rendered: u64,
}

/// Largest width or height a surface is created with
pub const MAX_SURFACE_SIDE: u32 = 4096;

impl SoftwareSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.clamp(1, MAX_SURFACE_SIDE);
        let height = height.clamp(1, MAX_SURFACE_SIDE);
        let len = width as usize * height as usize;
        let mut surface = Self {
            width,
            height,
            camera: OrbitCamera::new(),
            background: [17, 17, 17],
            light_dir: Vec3::new(0.3, 0.8, 0.5).normalize(),
            color: vec![Vec3::ZERO; len],
            depth: vec![f32::INFINITY; len],
            frames_rendered: 0,
        };
        surface.clear();
        surface
    }

    pub fn with_background(mut self, rgb: [u8; 3]) -> Self {
        self.background = rgb;
        self.clear();
        self
    }

    pub fn with_camera(mut self, camera: OrbitCamera) -> Self {
        self.camera = camera;
        self
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    fn background_color(&self) -> Vec3 {
        Vec3::new(
            self.background[0] as f32,
            self.background[1] as f32,
            self.background[2] as f32,
        ) / 255.0
    }

    fn clear(&mut self) {
        let bg = self.background_color();
        self.color.fill(bg);
        self.depth.fill(f32::INFINITY);
    }

    fn draw_mesh(&mut self, mesh: &SolidMesh, model: Mat4, view_proj: Mat4, pass: Pass) {
        let material = mesh.material;
        let geometry = &mesh.geometry;
        let mvp = view_proj * model;
        let normal_matrix = Mat3::from_mat4(model);
        let view_dir = self.camera.view_direction();
        let (w, h) = (self.width as f32, self.height as f32);
        let alpha = if pass == Pass::Blended {
            material.opacity
        } else {
            1.0
        };
        if pass == Pass::Blended && alpha < material.alpha_test {
            return;
        }

        for tri in geometry.indices.chunks_exact(3) {
            let idx = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if idx.iter().any(|&i| i >= geometry.vertex_count()) {
                continue;
            }
            let clip: [Vec4; 3] = idx.map(|i| mvp * geometry.position(i).extend(1.0));
            if clip.iter().any(|c| c.w <= NEAR_W) {
                continue;
            }
            let screen: [Vec3; 3] = clip.map(|c| {
                let ndc = c.truncate() / c.w;
                Vec3::new((ndc.x * 0.5 + 0.5) * w, (0.5 - ndc.y * 0.5) * h, ndc.z)
            });

            // Screen space is y-down, so front faces have negative area
            let area = edge(screen[0], screen[1], screen[2].truncate());
            if area.abs() < 1e-9 {
                continue;
            }
            let front = area < 0.0;
            if !front && !material.double_sided {
                continue;
            }

            let face_normal = idx
                .iter()
                .map(|&i| geometry.normal(i))
                .sum::<Vec3>();
            let mut n = (normal_matrix * face_normal).normalize_or_zero();
            if !front {
                n = -n;
            }
            let shade = shade(&material, n, self.light_dir, view_dir);

            let min_x = screen.iter().map(|s| s.x).fold(f32::MAX, f32::min).floor().max(0.0) as u32;
            let max_x = screen.iter().map(|s| s.x).fold(f32::MIN, f32::max).ceil().min(w - 1.0);
            let min_y = screen.iter().map(|s| s.y).fold(f32::MAX, f32::min).floor().max(0.0) as u32;
            let max_y = screen.iter().map(|s| s.y).fold(f32::MIN, f32::max).ceil().min(h - 1.0);
            if max_x < 0.0 || max_y < 0.0 {
                continue;
            }
            let (max_x, max_y) = (max_x as u32, max_y as u32);

            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    let w0 = edge(screen[1], screen[2], p) / area;
                    let w1 = edge(screen[2], screen[0], p) / area;
                    let w2 = edge(screen[0], screen[1], p) / area;
                    if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                        continue;
                    }
                    let z = w0 * screen[0].z + w1 * screen[1].z + w2 * screen[2].z;
                    let i = (y * self.width + x) as usize;
                    if z >= self.depth[i] {
                        continue;
                    }
                    match pass {
                        Pass::Opaque => {
                            self.color[i] = shade;
                            self.depth[i] = z;
                        }
                        Pass::Blended => {
                            self.color[i] = shade * alpha + self.color[i] * (1.0 - alpha);
                        }
                    }
                }
            }
        }
    }
}

/// Signed parallelogram area of (a, b, p)
fn edge(a: Vec3, b: Vec3, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Ambient + Lambert diffuse with a Blinn-Phong highlight; metals tint
/// the highlight and darken the diffuse term
fn shade(material: &SurfaceMaterial, n: Vec3, light: Vec3, view: Vec3) -> Vec3 {
    let base = Vec3::from_array(material.color.to_srgb_f32());
    let metalness = material.metalness.clamp(0.0, 1.0);
    let roughness = material.roughness.clamp(0.0, 1.0);

    let diffuse = n.dot(light).max(0.0);
    let lit = base * (AMBIENT + diffuse * (1.0 - AMBIENT)) * (1.0 - 0.5 * metalness);

    let half = (light + view).normalize_or_zero();
    let shininess = 2.0 + (1.0 - roughness).powi(2) * 126.0;
    let highlight = n.dot(half).max(0.0).powf(shininess) * (1.0 - roughness);
    let spec_color = Vec3::ONE.lerp(base, metalness);

    (lit + spec_color * highlight * material.env_map_intensity).clamp(Vec3::ZERO, Vec3::ONE)
}

impl RenderSurface for SoftwareSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render(&mut self, group: Option<&Group>) {
        self.clear();
        self.frames_rendered += 1;
        let Some(group) = group else {
            return;
        };
        let model = group.model_matrix();
        let view_proj = self
            .camera
            .view_projection(self.width as f32 / self.height as f32);

        for mesh in group.meshes.iter().filter(|m| !m.material.is_blended()) {
            self.draw_mesh(mesh, model, view_proj, Pass::Opaque);
        }
        for mesh in group.meshes.iter().filter(|m| m.material.is_blended()) {
            self.draw_mesh(mesh, model, view_proj, Pass::Blended);
        }
    }

    fn capture(&self) -> CapturedFrame {
        let mut pixels = Vec::with_capacity(self.color.len() * 4);
        for c in &self.color {
            pixels.extend_from_slice(&[
                (c.x.clamp(0.0, 1.0) * 255.0).round() as u8,
                (c.y.clamp(0.0, 1.0) * 255.0).round() as u8,
                (c.z.clamp(0.0, 1.0) * 255.0).round() as u8,
                255,
            ]);
        }
        CapturedFrame {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}
