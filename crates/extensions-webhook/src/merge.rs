//! Idempotent upserts over name-keyed lists
//!
//! Containers, env vars, volumes, volume mounts and OSC units are keyed by
//! name, OSC files by path. An upsert replaces the element with the same key
//! in place or appends it; order of unrelated elements is preserved and
//! nothing is ever removed.

use extensions_common::apis::{File, Unit};
use k8s_openapi::api::core::v1::{Container, EnvVar, Volume, VolumeMount};

/// A list element identified by a string key
pub trait Named {
    /// The element's identity within its list
    fn key(&self) -> &str;
}

impl Named for Container {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Named for EnvVar {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Named for Volume {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Named for VolumeMount {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Named for Unit {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Named for File {
    fn key(&self) -> &str {
        &self.path
    }
}

/// Find the element with the given key
pub fn with_key<'a, T: Named>(items: &'a [T], key: &str) -> Option<&'a T> {
    items.iter().find(|item| item.key() == key)
}

/// Replace the element with `item`'s key in place, or append `item`
pub fn ensure_with_key<T: Named>(items: &mut Vec<T>, item: T) {
    match items.iter().position(|existing| existing.key() == item.key()) {
        Some(i) => items[i] = item,
        None => items.push(item),
    }
}

/// Find a container by name
pub fn container_with_name<'a>(containers: &'a [Container], name: &str) -> Option<&'a Container> {
    with_key(containers, name)
}

/// Find a container by name for modification
pub fn container_with_name_mut<'a>(
    containers: &'a mut [Container],
    name: &str,
) -> Option<&'a mut Container> {
    containers.iter_mut().find(|c| c.name == name)
}

/// Upsert a container by name
pub fn ensure_container_with_name(containers: &mut Vec<Container>, container: Container) {
    ensure_with_key(containers, container)
}

/// Upsert an env var by name
pub fn ensure_env_var_with_name(env: &mut Option<Vec<EnvVar>>, var: EnvVar) {
    ensure_with_key(env.get_or_insert_with(Vec::new), var)
}

/// Upsert a volume by name
pub fn ensure_volume_with_name(volumes: &mut Option<Vec<Volume>>, volume: Volume) {
    ensure_with_key(volumes.get_or_insert_with(Vec::new), volume)
}

/// Upsert a volume mount by name
pub fn ensure_volume_mount_with_name(mounts: &mut Option<Vec<VolumeMount>>, mount: VolumeMount) {
    ensure_with_key(mounts.get_or_insert_with(Vec::new), mount)
}

/// Find an OSC unit by name
pub fn unit_with_name<'a>(units: &'a [Unit], name: &str) -> Option<&'a Unit> {
    with_key(units, name)
}

/// Upsert an OSC unit by name
pub fn ensure_unit_with_name(units: &mut Vec<Unit>, unit: Unit) {
    ensure_with_key(units, unit)
}

/// Find an OSC file by path
pub fn file_with_path<'a>(files: &'a [File], path: &str) -> Option<&'a File> {
    with_key(files, path)
}

/// Upsert an OSC file by path
pub fn ensure_file_with_path(files: &mut Vec<File>, file: File) {
    ensure_with_key(files, file)
}
