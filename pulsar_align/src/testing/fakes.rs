//! In-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use parking_lot::Mutex;

use crate::backend::{ObservationLoader, PhaseFitter, PortraitFitRequest, PortraitFitter};
use crate::config::Float;
use crate::engine::AlignedTemplate;
use crate::error::BackendError;
use crate::fit::{FitStatus, PhaseFit, PortraitFit};
use crate::observation::{LoadOptions, Observation};
use crate::pipeline::ArchiveTools;

/// Serves observations from memory and records every load.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    observations: HashMap<PathBuf, Observation>,
    loads: Mutex<Vec<(PathBuf, LoadOptions)>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observation` under its source path.
    pub fn with(mut self, observation: Observation) -> Self {
        self.observations
            .insert(observation.source.clone(), observation);
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.lock().len()
    }

    pub fn loads(&self) -> Vec<(PathBuf, LoadOptions)> {
        self.loads.lock().clone()
    }
}

impl ObservationLoader for MemoryLoader {
    fn load_observation(
        &self,
        path: &Path,
        options: &LoadOptions,
    ) -> Result<Observation, BackendError> {
        self.loads.lock().push((path.to_path_buf(), *options));
        self.observations
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such archive").into())
    }
}

/// Finds the whole-bin lag maximizing the circular cross-correlation.
///
/// Returns the lag `L` in `[0, nbin)` and the rotated profile, where
/// `rotated[t] = profile[(t + L) % nbin]`. Ties resolve to the smallest lag.
fn best_lag(profile: &[Float], template: &[Float]) -> (usize, Vec<Float>) {
    let n = profile.len();
    let mut best = (0, Float::NEG_INFINITY);
    for lag in 0..n {
        let ccf: Float = (0..n).map(|t| profile[(t + lag) % n] * template[t]).sum();
        if ccf > best.1 {
            best = (lag, ccf);
        }
    }
    let rotated = (0..n).map(|t| profile[(t + best.0) % n]).collect();
    (best.0, rotated)
}

/// Lag in bins as a phase in `[-0.5, 0.5)`.
fn lag_to_phase(lag: usize, nbin: usize) -> Float {
    let phase = lag as Float / nbin as Float;
    if phase >= 0.5 { phase - 1.0 } else { phase }
}

fn dot(a: &[Float], b: &[Float]) -> Float {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Whole-bin cross-correlation phase fitter.
#[derive(Debug, Default)]
pub struct CrossCorrelationPhaseFitter {
    calls: AtomicUsize,
}

impl CrossCorrelationPhaseFitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PhaseFitter for CrossCorrelationPhaseFitter {
    fn fit_phase(
        &self,
        profile: &[Float],
        template: &[Float],
        noise: Option<Float>,
    ) -> Result<PhaseFit, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if profile.len() != template.len() || profile.is_empty() {
            return Err(anyhow!(
                "profile has {} bins, template has {}",
                profile.len(),
                template.len()
            )
            .into());
        }
        let power = dot(template, template);
        if power <= 0.0 {
            return Err(anyhow!("template profile has no power").into());
        }

        let (lag, rotated) = best_lag(profile, template);
        let sigma = noise.unwrap_or(1.0);
        Ok(PhaseFit {
            phase: lag_to_phase(lag, profile.len()),
            phase_error: sigma / (power.sqrt() * profile.len() as Float),
            scale: dot(&rotated, template) / power,
            scale_error: sigma / power.sqrt(),
        })
    }
}

/// Joint fitter that aligns the mean profiles by whole-bin cross-correlation,
/// echoes the DM guess and fits one amplitude per channel.
#[derive(Debug)]
pub struct CrossCorrelationPortraitFitter {
    calls: AtomicUsize,
    status: FitStatus,
}

impl Default for CrossCorrelationPortraitFitter {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            status: FitStatus::Converged(1),
        }
    }
}

impl CrossCorrelationPortraitFitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report every fit with `status`.
    pub fn with_status(mut self, status: FitStatus) -> Self {
        self.status = status;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PortraitFitter for CrossCorrelationPortraitFitter {
    fn fit_portrait(&self, request: &PortraitFitRequest<'_>) -> Result<PortraitFit, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let portrait = request.portrait;
        let template = request.template;
        if portrait.shape() != template.shape() {
            return Err(anyhow!(
                "portrait is {:?}, template is {:?}",
                portrait.shape(),
                template.shape()
            )
            .into());
        }

        let nbin = portrait.nbin();
        let (lag, _) = best_lag(&portrait.mean_profile(), &template.mean_profile());

        let mut scales = Vec::with_capacity(portrait.nchan());
        let mut scale_errors = Vec::with_capacity(portrait.nchan());
        for (ichan, (data, model)) in portrait.channels().zip(template.channels()).enumerate() {
            let rotated: Vec<Float> = (0..nbin).map(|t| data[(t + lag) % nbin]).collect();
            let power = dot(model, model);
            if power > 0.0 {
                scales.push(dot(&rotated, model) / power);
                scale_errors.push(request.noise_stds[ichan] / power.sqrt());
            } else {
                scales.push(0.0);
                scale_errors.push(Float::INFINITY);
            }
        }

        Ok(PortraitFit {
            phase: lag_to_phase(lag, nbin),
            phase_error: 1.0 / nbin as Float,
            dm: request.dm_guess,
            dm_error: 0.0,
            scales,
            scale_errors,
            reference_frequency: request.reference_frequency,
            covariance: 0.0,
            status: self.status,
            iterations: nbin,
        })
    }
}

/// Joint fitter returning fixed values and counting calls.
#[derive(Debug)]
pub struct ScriptedPortraitFitter {
    phase: Float,
    dm: Float,
    scale: Float,
    scale_error: Float,
    status: FitStatus,
    /// Fail every call with this message.
    failure: Option<&'static str>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(Float, Float)>>,
}

impl Default for ScriptedPortraitFitter {
    fn default() -> Self {
        Self {
            phase: 0.0,
            dm: 0.0,
            scale: 1.0,
            scale_error: 0.1,
            status: FitStatus::Converged(1),
            failure: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedPortraitFitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &'static str) -> Self {
        Self {
            failure: Some(message),
            ..Self::default()
        }
    }

    pub fn with_phase(mut self, phase: Float) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_dm(mut self, dm: Float) -> Self {
        self.dm = dm;
        self
    }

    /// Report `scale` for every channel.
    pub fn with_scale(mut self, scale: Float) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_status(mut self, status: FitStatus) -> Self {
        self.status = status;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(phase_guess, dm_guess)` of every request.
    pub fn guesses(&self) -> Vec<(Float, Float)> {
        self.requests.lock().clone()
    }
}

impl PortraitFitter for ScriptedPortraitFitter {
    fn fit_portrait(&self, request: &PortraitFitRequest<'_>) -> Result<PortraitFit, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .push((request.phase_guess, request.dm_guess));
        if let Some(message) = self.failure {
            return Err(anyhow!(message).into());
        }
        let nchan = request.portrait.nchan();
        Ok(PortraitFit {
            phase: self.phase,
            phase_error: 1e-3,
            dm: self.dm,
            dm_error: 1e-4,
            scales: vec![self.scale; nchan],
            scale_errors: vec![self.scale_error; nchan],
            reference_frequency: request.reference_frequency,
            covariance: 1e-6,
            status: self.status,
            iterations: 7,
        })
    }
}

/// Archive tools operating on an in-memory file set.
#[derive(Debug, Default)]
pub struct MemoryArchiveTools {
    /// Archives that exist, created by `incoherent_sum` or `persist_template`.
    pub files: Mutex<HashSet<PathBuf>>,
    /// Operation log, e.g. `"smooth out.fits"`.
    pub calls: Mutex<Vec<String>>,
    pub persisted: Mutex<Option<AlignedTemplate>>,
}

impl MemoryArchiveTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains(path)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn log(&self, operation: &str, path: &Path) {
        self.calls
            .lock()
            .push(format!("{operation} {}", path.display()));
    }
}

impl ArchiveTools for MemoryArchiveTools {
    fn incoherent_sum(
        &self,
        observations: &[PathBuf],
        output: &Path,
        phase_align: bool,
    ) -> Result<(), BackendError> {
        if observations.is_empty() {
            return Err(anyhow!("nothing to add").into());
        }
        let operation = if phase_align { "sum_aligned" } else { "sum" };
        self.log(operation, output);
        self.files.lock().insert(output.to_path_buf());
        Ok(())
    }

    fn persist_template(
        &self,
        template: &AlignedTemplate,
        like: &Path,
        output: &Path,
    ) -> Result<(), BackendError> {
        if !self.exists(like) {
            return Err(anyhow!("missing template archive").into());
        }
        self.log("persist", output);
        self.files.lock().insert(output.to_path_buf());
        *self.persisted.lock() = Some(template.clone());
        Ok(())
    }

    fn smooth(&self, archive: &Path) -> Result<(), BackendError> {
        self.log("smooth", archive);
        Ok(())
    }

    fn remove(&self, archive: &Path) -> Result<(), BackendError> {
        self.log("remove", archive);
        self.files.lock().remove(archive);
        Ok(())
    }
}
