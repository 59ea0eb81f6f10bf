//! Shrink job description.

use std::path::{Path, PathBuf};

use backwatch_config::{ShrinkSettings, WatchProfile};
use backwatch_events::JobId;
use uuid::Uuid;

use crate::command::ShrinkCommand;
use crate::error::{ShrinkError, ShrinkResult};

/// One confirmed shrink of one image.
#[derive(Debug, Clone)]
pub struct ShrinkJob {
    id: JobId,
    image: PathBuf,
    folder: PathBuf,
    settings: ShrinkSettings,
    command: ShrinkCommand,
    job_log: PathBuf,
}

impl ShrinkJob {
    /// Describe a shrink of `image` using the profile's script and the saved settings.
    ///
    /// # Errors
    ///
    /// Returns [`ShrinkError::InvalidJob`] when the image has no parent folder.
    pub fn new(image: &Path, settings: ShrinkSettings, profile: &WatchProfile) -> ShrinkResult<Self> {
        let command = ShrinkCommand::build(
            &profile.shrink_script,
            &settings.options,
            image,
            &profile.elevation,
            &profile.interpreter,
        );
        Self::with_command(image, settings, command, &profile.job_log_name)
    }

    /// Describe a job with an explicit command.
    ///
    /// # Errors
    ///
    /// Returns [`ShrinkError::InvalidJob`] when the image has no parent folder.
    pub fn with_command(
        image: &Path,
        settings: ShrinkSettings,
        command: ShrinkCommand,
        job_log_name: &str,
    ) -> ShrinkResult<Self> {
        let folder = image
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .ok_or_else(|| ShrinkError::InvalidJob {
                field: "image",
                reason: "no_parent_folder",
                value: Some(image.display().to_string()),
            })?
            .to_path_buf();
        Ok(Self {
            id: Uuid::new_v4(),
            image: image.to_path_buf(),
            job_log: folder.join(job_log_name),
            folder,
            settings,
            command,
        })
    }

    /// Job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Image being shrunk.
    #[must_use]
    pub fn image(&self) -> &Path {
        &self.image
    }

    /// Backup folder owning the image.
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Settings captured when the job was confirmed.
    #[must_use]
    pub const fn settings(&self) -> &ShrinkSettings {
        &self.settings
    }

    /// Command to execute.
    #[must_use]
    pub const fn command(&self) -> &ShrinkCommand {
        &self.command
    }

    /// Per-job log path inside the backup folder.
    #[must_use]
    pub fn job_log_path(&self) -> &Path {
        &self.job_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_derives_folder_log_and_command() {
        let profile = WatchProfile {
            shrink_script: PathBuf::from("/opt/pishrink.sh"),
            ..WatchProfile::default()
        };
        let image = Path::new("/b/raspihaupt-dd-backup-20240101-120000/disk.img");
        let job = ShrinkJob::new(image, ShrinkSettings::default(), &profile).expect("job");
        assert_eq!(
            job.folder(),
            Path::new("/b/raspihaupt-dd-backup-20240101-120000")
        );
        assert_eq!(
            job.job_log_path(),
            Path::new("/b/raspihaupt-dd-backup-20240101-120000/shrink.log")
        );
        assert_eq!(
            job.command().display(),
            "sudo bash \"/opt/pishrink.sh\" \"/b/raspihaupt-dd-backup-20240101-120000/disk.img\""
        );
    }

    #[test]
    fn bare_file_name_is_rejected() {
        let err = ShrinkJob::new(
            Path::new("disk.img"),
            ShrinkSettings::default(),
            &WatchProfile::default(),
        )
        .expect_err("no parent");
        assert!(matches!(err, ShrinkError::InvalidJob { field: "image", .. }));
    }
}
