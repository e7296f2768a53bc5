//! Human-inspectable debug output: coordinate dump, HTML figure and a
//! top-down PNG render.

use image::{Rgb, RgbImage};
use pallet_annot_core::{Frame, Pt3, Real, SceneGeometry};
use serde::Serialize;

pub const DEBUG_COORDINATES_DIR: &str = "debug_3d/coordinates";
pub const DEBUG_FIGURES_DIR: &str = "debug_3d/figures";
pub const DEBUG_IMAGES_DIR: &str = "debug_3d/images";

/// Side length of the top-down render in pixels.
pub const RENDER_SIZE: u32 = 640;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const OBJECT: Rgb<u8> = Rgb([150, 150, 150]);
const TRACKABLE: Rgb<u8> = Rgb([40, 80, 200]);
const SELECTED: Rgb<u8> = Rgb([20, 170, 40]);
const CAMERA: Rgb<u8> = Rgb([220, 30, 30]);

fn fmt_pt(p: &Pt3) -> String {
    format!("({:.4}, {:.4}, {:.4})", p.x, p.y, p.z)
}

/// Plain-text geometry dump of one frame.
pub fn coordinates_text<G>(frame: &Frame, scene: &G) -> String
where
    G: SceneGeometry + ?Sized,
{
    let eye = frame.camera.position();
    let mut lines = vec![
        format!("Frame {:06}", frame.index),
        format!("Camera position: {}", fmt_pt(&eye)),
        format!(
            "Camera forward: {}",
            fmt_pt(&Pt3::from(frame.camera.forward()))
        ),
        format!(
            "Resolution: {}x{}",
            frame.resolution.width, frame.resolution.height
        ),
        String::new(),
        "Objects:".to_string(),
    ];

    let trackable = scene.trackable_objects();
    for object in &trackable {
        let center = object.volume.center();
        lines.push(format!(
            "  {} ({}) center {} distance {:.4}",
            object.id,
            object.label,
            fmt_pt(&center),
            (center - eye).norm()
        ));
        for (i, corner) in object.volume.corners().iter().enumerate() {
            lines.push(format!("    corner {i}: {}", fmt_pt(corner)));
        }
    }

    lines.push(String::new());
    lines.push("Selected faces:".to_string());
    let mut visible_total = 0;
    for det in &frame.detections {
        let visible = det.visible_keypoints();
        visible_total += visible;
        lines.push(format!(
            "  {} {}: distance {:.4} area {:.4} keypoints visible {visible}/{}",
            det.object_id,
            det.face.side,
            (det.face.center() - eye).norm(),
            det.face.area,
            det.keypoints.len()
        ));
        for kp in &det.keypoints {
            lines.push(format!(
                "    {}: 3d {} 2d ({:.6}, {:.6}) {}",
                kp.kind.name(),
                fmt_pt(&kp.position_3d),
                kp.position_2d.x,
                kp.position_2d.y,
                if kp.visibility.is_visible() {
                    "visible"
                } else {
                    "hidden"
                }
            ));
        }
    }

    let keypoint_total: usize = frame.detections.iter().map(|d| d.keypoints.len()).sum();
    lines.push(String::new());
    lines.push(format!(
        "Summary: {} trackable objects, {} faces, {visible_total}/{keypoint_total} keypoints visible",
        trackable.len(),
        frame.detections.len()
    ));
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[derive(Serialize)]
struct FigureBox {
    id: String,
    trackable: bool,
    corners: Vec<[Real; 3]>,
}

#[derive(Serialize)]
struct FigureFace {
    label: String,
    corners: Vec<[Real; 3]>,
    keypoints: Vec<([Real; 3], bool)>,
}

#[derive(Serialize)]
struct FigureData {
    title: String,
    camera: [Real; 3],
    boxes: Vec<FigureBox>,
    faces: Vec<FigureFace>,
}

fn arr(p: &Pt3) -> [Real; 3] {
    [p.x, p.y, p.z]
}

const FIGURE_SCRIPT: &str = r#"
const canvas = document.getElementById('view');
const ctx = canvas.getContext('2d');
const edges = [[0,1],[1,3],[3,2],[2,0],[4,5],[5,7],[7,6],[6,4],[0,4],[1,5],[2,6],[3,7]];
let yaw = -0.6, pitch = 0.5, zoom = 1.0, drag = null;
const pts = [DATA.camera];
DATA.boxes.forEach(b => pts.push(...b.corners));
const c = [0, 1, 2].map(i => pts.reduce((s, p) => s + p[i], 0) / pts.length);
const r = Math.max(...pts.map(p => Math.hypot(p[0] - c[0], p[1] - c[1], p[2] - c[2])), 1e-3);
function project(p) {
  const x = p[0] - c[0], y = p[1] - c[1], z = p[2] - c[2];
  const x1 = x * Math.cos(yaw) - y * Math.sin(yaw);
  const y1 = x * Math.sin(yaw) + y * Math.cos(yaw);
  const y2 = y1 * Math.sin(pitch) + z * Math.cos(pitch);
  const s = zoom * 0.45 * Math.min(canvas.width, canvas.height) / r;
  return [canvas.width / 2 + x1 * s, canvas.height / 2 - y2 * s];
}
function poly(corners, closed) {
  ctx.beginPath();
  corners.map(project).forEach((q, i) => i ? ctx.lineTo(q[0], q[1]) : ctx.moveTo(q[0], q[1]));
  if (closed) ctx.closePath();
  ctx.stroke();
}
function draw() {
  ctx.clearRect(0, 0, canvas.width, canvas.height);
  DATA.boxes.forEach(b => {
    ctx.strokeStyle = b.trackable ? '#2850c8' : '#999';
    edges.forEach(e => poly([b.corners[e[0]], b.corners[e[1]]], false));
  });
  ctx.lineWidth = 2;
  DATA.faces.forEach(f => {
    ctx.strokeStyle = '#14aa28';
    poly(f.corners, true);
    f.keypoints.forEach(k => {
      const q = project(k[0]);
      ctx.fillStyle = k[1] ? '#14aa28' : '#dc1e1e';
      ctx.fillRect(q[0] - 3, q[1] - 3, 6, 6);
    });
  });
  ctx.lineWidth = 1;
  const e = project(DATA.camera);
  ctx.fillStyle = '#dc1e1e';
  ctx.beginPath();
  ctx.arc(e[0], e[1], 5, 0, 2 * Math.PI);
  ctx.fill();
}
canvas.onmousedown = ev => { drag = [ev.clientX, ev.clientY]; };
window.onmouseup = () => { drag = null; };
window.onmousemove = ev => {
  if (!drag) return;
  yaw += (ev.clientX - drag[0]) * 0.01;
  pitch = Math.max(-1.5, Math.min(1.5, pitch + (ev.clientY - drag[1]) * 0.01));
  drag = [ev.clientX, ev.clientY];
  draw();
};
canvas.onwheel = ev => { ev.preventDefault(); zoom *= ev.deltaY < 0 ? 1.1 : 0.9; draw(); };
draw();
"#;

/// Self-contained HTML page with a rotatable wireframe of the frame.
pub fn figure_html<G>(frame: &Frame, scene: &G) -> Result<String, serde_json::Error>
where
    G: SceneGeometry + ?Sized,
{
    let data = FigureData {
        title: format!("frame {:06}", frame.index),
        camera: arr(&frame.camera.position()),
        boxes: scene
            .objects()
            .iter()
            .map(|o| FigureBox {
                id: o.id.clone(),
                trackable: o.trackable,
                corners: o.volume.corners().iter().map(arr).collect(),
            })
            .collect(),
        faces: frame
            .detections
            .iter()
            .map(|d| FigureFace {
                label: format!("{} {}", d.object_id, d.face.side),
                corners: d.face.corners.iter().map(arr).collect(),
                keypoints: d
                    .keypoints
                    .iter()
                    .map(|k| (arr(&k.position_3d), k.visibility.is_visible()))
                    .collect(),
            })
            .collect(),
    };
    // `</` must not appear inside the inline script.
    let json = serde_json::to_string(&data)?.replace("</", "<\\/");
    let legend = frame
        .detections
        .iter()
        .map(|d| {
            format!(
                "<li>{} {}: {}/{} keypoints visible</li>",
                quick_xml::escape::escape(d.object_id.as_str()),
                d.face.side,
                d.visible_keypoints(),
                d.keypoints.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>body {{ font-family: sans-serif; }} canvas {{ border: 1px solid #ccc; }}</style>\n\
         </head>\n<body>\n<h3>{title}</h3>\n<canvas id=\"view\" width=\"900\" height=\"650\"></canvas>\n\
         <ul>\n{legend}\n</ul>\n<script>\nconst DATA = {json};\n{FIGURE_SCRIPT}</script>\n</body>\n</html>\n",
        title = data.title,
    ))
}

/// Maps world XY onto the square render, y pointing up.
struct TopDown {
    min_x: Real,
    min_y: Real,
    scale: Real,
}

impl TopDown {
    fn fit(points: impl IntoIterator<Item = Pt3>) -> Self {
        let (mut lo, mut hi) = ([Real::MAX; 2], [Real::MIN; 2]);
        for p in points {
            lo = [lo[0].min(p.x), lo[1].min(p.y)];
            hi = [hi[0].max(p.x), hi[1].max(p.y)];
        }
        if lo[0] > hi[0] {
            lo = [-1.0, -1.0];
            hi = [1.0, 1.0];
        }
        let span = (hi[0] - lo[0]).max(hi[1] - lo[1]).max(1e-3) * 1.1;
        let (cx, cy) = (0.5 * (lo[0] + hi[0]), 0.5 * (lo[1] + hi[1]));
        Self {
            min_x: cx - 0.5 * span,
            min_y: cy - 0.5 * span,
            scale: Real::from(RENDER_SIZE - 1) / span,
        }
    }

    fn pixel(&self, p: &Pt3) -> (i64, i64) {
        let u = (p.x - self.min_x) * self.scale;
        let v = Real::from(RENDER_SIZE - 1) - (p.y - self.min_y) * self.scale;
        (u.round() as i64, v.round() as i64)
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(img.width()) && y < i64::from(img.height()) {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let (dx, dy) = ((to.0 - x).abs(), -(to.1 - y).abs());
    let (sx, sy) = (if x < to.0 { 1 } else { -1 }, if y < to.1 { 1 } else { -1 });
    let mut err = dx + dy;
    loop {
        put(img, x, y, color);
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn dot(img: &mut RgbImage, at: (i64, i64), radius: i64, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(img, at.0 + dx, at.1 + dy, color);
            }
        }
    }
}

/// Top-down view of the scene footprints, selected faces and the camera.
pub fn render_top_down<G>(frame: &Frame, scene: &G) -> RgbImage
where
    G: SceneGeometry + ?Sized,
{
    let eye = frame.camera.position();
    let view = TopDown::fit(
        scene
            .objects()
            .iter()
            .flat_map(|o| o.volume.corners().iter().copied())
            .chain(std::iter::once(eye)),
    );
    let mut img = RgbImage::from_pixel(RENDER_SIZE, RENDER_SIZE, BACKGROUND);

    for object in scene.objects() {
        let c = object.volume.corners();
        let color = if object.trackable { TRACKABLE } else { OBJECT };
        // Bottom rectangle in bit order 0-1-3-2.
        for (a, b) in [(0, 1), (1, 3), (3, 2), (2, 0)] {
            line(&mut img, view.pixel(&c[a]), view.pixel(&c[b]), color);
        }
    }
    for det in &frame.detections {
        let [a, b, ..] = det.face.corners;
        line(&mut img, view.pixel(&a), view.pixel(&b), SELECTED);
        dot(&mut img, view.pixel(&det.face.center()), 2, SELECTED);
    }

    let eye_px = view.pixel(&eye);
    let heading = eye + frame.camera.forward() * (40.0 / view.scale);
    line(&mut img, eye_px, view.pixel(&heading), CAMERA);
    dot(&mut img, eye_px, 4, CAMERA);
    img
}
