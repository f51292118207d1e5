//! Enrollments kept on disk as `<name>.key` / `<name>.pem` pairs.

use anyhow::{anyhow, Context};
use fabric_sdk::{
    crypto::PrivateKey,
    identity::{Enrollment, UserInfo},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug)]
pub struct EnrollmentStore {
    dir: PathBuf,
    msp_id: String,
}

impl EnrollmentStore {
    pub fn new(dir: impl AsRef<Path>, msp_id: &str) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Unable to create enrollment directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            msp_id: msp_id.to_string(),
        })
    }

    fn key_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.key"))
    }

    fn certificate_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.pem"))
    }

    pub fn save(&self, name: &str, enrollment: &Enrollment) -> anyhow::Result<()> {
        if name.is_empty() {
            return Err(anyhow!("Cannot store an enrollment without a name"));
        }
        fs::write(self.key_path(name), enrollment.key().as_pem())?;
        fs::write(self.certificate_path(name), enrollment.certificate())?;
        Ok(())
    }

    pub fn load_enrollment(&self, name: &str) -> anyhow::Result<Enrollment> {
        let key_path = self.key_path(name);
        let key = fs::read_to_string(&key_path).with_context(|| {
            format!(
                "No enrollment for {name}: can't read {}",
                key_path.display()
            )
        })?;
        let certificate_path = self.certificate_path(name);
        let certificate = fs::read_to_string(&certificate_path).with_context(|| {
            format!(
                "No enrollment for {name}: can't read {}",
                certificate_path.display()
            )
        })?;
        Ok(Enrollment::new(PrivateKey::from_pem(key), certificate))
    }

    /// Load an enrolled identity for signing requests.
    pub fn load_user(&self, name: &str) -> anyhow::Result<UserInfo> {
        let enrollment = self.load_enrollment(name)?;
        Ok(UserInfo::new(name, &self.msp_id).with_enrollment(enrollment))
    }
}
