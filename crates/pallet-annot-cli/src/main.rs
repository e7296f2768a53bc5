use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail, ensure};
use clap::Parser;
use log::{info, warn};
use pallet_annot_core::{
    AnnotationConfig, Camera, CameraSpec, Real, Scene, SceneObject, annotate_frame, synthetic,
};
use pallet_annot_export::{AnnotationFormat, DatasetInfo, ExportConfig, RunWriter, allocate_run};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Synthetic warehouse size used by `--synthetic`.
const SYNTHETIC_ROWS: usize = 3;
const SYNTHETIC_COLS: usize = 4;
const SYNTHETIC_ORBIT_RADIUS: Real = 9.0;

/// Pallet face keypoint annotation runs.
#[derive(Debug, Parser)]
#[command(author, version, about = "Annotate pallet faces with YOLO / COCO / VOC keypoints")]
struct Args {
    /// Scene snapshot JSON: `{ "frames": [ { "index", "camera", "objects" } ] }`.
    #[arg(long, required_unless_present = "synthetic", conflicts_with = "synthetic")]
    scene: Option<PathBuf>,

    /// Optional run configuration JSON. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `output_root` of the configuration.
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Overrides `mode` of the configuration.
    #[arg(long)]
    mode: Option<String>,

    /// Comma-separated formats, e.g. `yolo,coco`.
    #[arg(long)]
    formats: Option<String>,

    /// Annotate N orbit frames of a synthetic warehouse instead of a scene file.
    #[arg(long, value_name = "N")]
    synthetic: Option<usize>,

    /// Seed of the synthetic warehouse.
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

/// Everything a run needs besides the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct RunConfig {
    mode: String,
    output_root: PathBuf,
    annotation: AnnotationConfig,
    export: ExportConfig,
    /// Objects whose smallest extent is below this size (m) never occlude.
    min_occluder_size: Real,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: "warehouse".to_string(),
            output_root: PathBuf::from("output"),
            annotation: AnnotationConfig::default(),
            export: ExportConfig::default(),
            min_occluder_size: 0.01,
        }
    }
}

impl RunConfig {
    fn validate(&self) -> Result<()> {
        self.annotation.validate()?;
        self.export.validate()?;
        ensure!(
            self.min_occluder_size.is_finite() && self.min_occluder_size >= 0.0,
            "min_occluder_size must be a non-negative number, got {}",
            self.min_occluder_size
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SceneFile {
    frames: Vec<FrameSnapshot>,
}

#[derive(Debug, Deserialize)]
struct FrameSnapshot {
    index: usize,
    camera: Option<CameraSpec>,
    #[serde(default)]
    objects: Vec<SceneObject>,
}

/// A frame ready for annotation.
struct PreparedFrame {
    index: usize,
    camera: Camera,
    scene: Scene,
}

fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) if path.exists() => load_json_file::<RunConfig>(path)?,
        Some(path) => {
            warn!("{} does not exist, using defaults", path.display());
            RunConfig::default()
        }
        None => RunConfig::default(),
    };
    if let Some(mode) = &args.mode {
        config.mode.clone_from(mode);
    }
    if let Some(root) = &args.output_root {
        config.output_root.clone_from(root);
    }
    if let Some(list) = &args.formats {
        config.export.formats = AnnotationFormat::parse_list(list)?;
    }
    config.validate()?;
    Ok(config)
}

fn scene_frames(path: &Path, config: &RunConfig) -> Result<Vec<PreparedFrame>> {
    let file: SceneFile = load_json_file(path)?;
    let mut seen = HashSet::new();
    for snapshot in &file.frames {
        if !seen.insert(snapshot.index) {
            bail!("frame index {} appears twice in {}", snapshot.index, path.display());
        }
        if let Some(spec) = &snapshot.camera {
            spec.resolution
                .validate()
                .with_context(|| format!("frame {}", snapshot.index))?;
        }
    }

    let mut frames = Vec::with_capacity(file.frames.len());
    for snapshot in file.frames {
        let Some(spec) = snapshot.camera else {
            warn!("frame {}: no camera, skipped", snapshot.index);
            continue;
        };
        let camera = match spec.build() {
            Ok(camera) => camera,
            Err(err) => {
                warn!("frame {}: unusable camera ({err:#}), skipped", snapshot.index);
                continue;
            }
        };
        frames.push(PreparedFrame {
            index: snapshot.index,
            camera,
            scene: Scene::new(snapshot.objects).with_min_occluder_size(config.min_occluder_size),
        });
    }
    Ok(frames)
}

fn synthetic_frames(count: usize, seed: u64, config: &RunConfig) -> Result<Vec<PreparedFrame>> {
    let scene = synthetic::warehouse(seed, SYNTHETIC_ROWS, SYNTHETIC_COLS)
        .with_min_occluder_size(config.min_occluder_size);
    let orbit = synthetic::Orbit {
        radius: SYNTHETIC_ORBIT_RADIUS,
        ..Default::default()
    };
    Ok(synthetic::orbit_cameras(&orbit, count)?
        .into_iter()
        .enumerate()
        .map(|(index, camera)| PreparedFrame {
            index,
            camera,
            scene: scene.clone(),
        })
        .collect())
}

/// Validate inputs, allocate a run and annotate every frame into it.
fn run(args: &Args) -> Result<(PathBuf, DatasetInfo)> {
    let config = load_config(args)?;
    let frames = match (args.synthetic, &args.scene) {
        (Some(count), _) => synthetic_frames(count, args.seed, &config)?,
        (None, Some(path)) => scene_frames(path, &config)?,
        (None, None) => bail!("either --scene or --synthetic is required"),
    };
    ensure!(!frames.is_empty(), "no frame with a usable camera");

    let layout = allocate_run(&config.mode, &config.output_root)?;
    let root = layout.root.clone();
    let mut writer = RunWriter::new(
        layout,
        config.mode.as_str(),
        config.export.clone(),
        config.annotation.clone(),
    )?;
    for prepared in &frames {
        let frame = annotate_frame(
            &prepared.scene,
            &prepared.camera,
            prepared.index,
            &config.annotation,
        );
        info!(
            "frame {}: {} detections",
            prepared.index,
            frame.detections.len()
        );
        writer
            .write_frame(frame, &prepared.scene)
            .with_context(|| format!("failed to write frame {}", prepared.index))?;
    }
    let summary = writer.finish()?;
    Ok((root, summary))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let (root, summary) = run(&args)?;
    println!(
        "{}: {} frames, {} detections, {}/{} keypoints visible",
        root.display(),
        summary.frame_count,
        summary.detection_count,
        summary.keypoints_visible,
        summary.keypoints_total
    );
    Ok(())
}
