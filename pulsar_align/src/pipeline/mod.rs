//! End-to-end alignment jobs: metafile in, aligned template archive out.
//!
//! Archive manipulation (summing, writing, smoothing, deleting) goes through
//! [`ArchiveTools`]; the alignment itself runs on [`AlignmentEngine`].


use std::path::{Path, PathBuf};

use crate::backend::Backends;
use crate::config::AlignConfig;
use crate::engine::{AlignedTemplate, AlignmentEngine};
use crate::error::{BackendError, Error};
use crate::observation::LoadOptions;

/// Suffix appended to the metafile path for the default output archive.
pub const DEFAULT_OUTFILE_SUFFIX: &str = ".algnd.fits";

/// Suffix appended to the metafile path for the summed initial template.
pub const TEMPORARY_TEMPLATE_SUFFIX: &str = ".tmp.fits";

/// Archive-level operations provided by the data-format layer.
pub trait ArchiveTools: Send + Sync {
    /// Sum `observations` into `output` without fitting; with `phase_align`
    /// the archives are phase-aligned before adding.
    fn incoherent_sum(
        &self,
        observations: &[PathBuf],
        output: &Path,
        phase_align: bool,
    ) -> Result<(), BackendError>;

    /// Write `template` to `output`, taking the archive layout from `like`.
    /// Channels listed by [`AlignedTemplate::zero_weight_channels`] or
    /// [`AlignedTemplate::negative_weight_channels`] are flagged and the DM
    /// is set to zero.
    fn persist_template(
        &self,
        template: &AlignedTemplate,
        like: &Path,
        output: &Path,
    ) -> Result<(), BackendError>;

    /// Smooth the archive at `archive` in place.
    fn smooth(&self, archive: &Path) -> Result<(), BackendError>;

    fn remove(&self, archive: &Path) -> Result<(), BackendError>;
}

/// Read observation paths from a metafile, one per line.
pub fn read_metafile(path: &Path) -> Result<Vec<PathBuf>, Error> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::ReadMetafile {
        path: path.to_path_buf(),
        source,
    })?;
    let paths: Vec<PathBuf> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect();
    if paths.is_empty() {
        return Err(Error::NoObservations);
    }
    Ok(paths)
}

/// What to align and where to put the result.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentJob {
    pub metafile: PathBuf,
    /// Archive holding the initial template. When absent, the observations
    /// are summed into a temporary archive first.
    pub initial_template: Option<PathBuf>,
    pub outfile: Option<PathBuf>,
    /// Phase-align observations when summing the initial template.
    pub phase_align_initial: bool,
    /// Smooth the output archive after writing it.
    pub smooth: bool,
}

impl AlignmentJob {
    pub fn new(metafile: impl Into<PathBuf>) -> Self {
        Self {
            metafile: metafile.into(),
            initial_template: None,
            outfile: None,
            phase_align_initial: false,
            smooth: false,
        }
    }

    pub fn with_initial_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.initial_template = Some(path.into());
        self
    }

    pub fn with_outfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.outfile = Some(path.into());
        self
    }

    pub fn with_phase_align_initial(mut self, phase_align: bool) -> Self {
        self.phase_align_initial = phase_align;
        self
    }

    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    /// The output archive, `<metafile>.algnd.fits` unless set.
    pub fn outfile(&self) -> PathBuf {
        self.outfile
            .clone()
            .unwrap_or_else(|| with_suffix(&self.metafile, DEFAULT_OUTFILE_SUFFIX))
    }

    /// Where the summed initial template is written when none is given.
    pub fn temporary_template(&self) -> PathBuf {
        with_suffix(&self.metafile, TEMPORARY_TEMPLATE_SUFFIX)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Run `job` and return the path of the written template.
///
/// A temporary initial template is removed again whether or not the
/// alignment succeeded.
pub fn run_job(
    job: &AlignmentJob,
    config: &AlignConfig,
    backends: Backends<'_>,
    tools: &dyn ArchiveTools,
) -> Result<PathBuf, Error> {
    config.validate()?;
    let paths = read_metafile(&job.metafile)?;
    let outfile = job.outfile();

    let (template_path, temporary) = match &job.initial_template {
        Some(path) => (path.clone(), false),
        None => {
            let temp = job.temporary_template();
            tracing::info!(
                observations = paths.len(),
                path = %temp.display(),
                phase_align = job.phase_align_initial,
                "Summing observations into initial template"
            );
            tools
                .incoherent_sum(&paths, &temp, job.phase_align_initial)
                .map_err(|source| Error::Archive {
                    operation: "incoherent_sum",
                    path: temp.clone(),
                    source,
                })?;
            (temp, true)
        }
    };

    let result = align_and_write(&paths, &template_path, &outfile, job, config, backends, tools);

    if temporary {
        if let Err(source) = tools.remove(&template_path) {
            let err = Error::Archive {
                operation: "remove",
                path: template_path.clone(),
                source,
            };
            // Cleanup failures are returned only when the run itself succeeded.
            if result.is_ok() {
                return Err(err);
            }
            tracing::warn!(error = %err, "Failed to remove temporary template");
        }
    }

    result.map(|()| outfile)
}

fn align_and_write(
    paths: &[PathBuf],
    template_path: &Path,
    outfile: &Path,
    job: &AlignmentJob,
    config: &AlignConfig,
    backends: Backends<'_>,
    tools: &dyn ArchiveTools,
) -> Result<(), Error> {
    let template = backends
        .loader
        .load_observation(template_path, &LoadOptions::template())
        .map_err(|source| Error::Load {
            path: template_path.to_path_buf(),
            source,
        })?;
    template.validate()?;
    if template.subints.is_empty() {
        return Err(Error::EmptyTemplate);
    }
    let initial = template.masked_portrait(0);

    let engine = AlignmentEngine::new(config.clone(), backends)?;
    let aligned = engine.run(paths, initial)?;

    tools
        .persist_template(&aligned, template_path, outfile)
        .map_err(|source| Error::Archive {
            operation: "persist_template",
            path: outfile.to_path_buf(),
            source,
        })?;
    if !config.quiet {
        tracing::info!(path = %outfile.display(), "Wrote aligned template");
    }

    if job.smooth {
        tools.smooth(outfile).map_err(|source| Error::Archive {
            operation: "smooth",
            path: outfile.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
