//! Shader source loading and validated module creation.
//!
//! Shaders live as text files next to the binary and are read at
//! startup; a missing file or a validation error is an init failure.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read shader '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("shader '{name}' failed validation:\n{log}")]
    Validation { name: String, log: String },
}

/// Strip a UTF-8 BOM and any leading whitespace so the source starts at
/// its first directive regardless of how the file was saved.
pub fn clean_source(raw: &str) -> &str {
    raw.trim_start_matches('\u{feff}').trim_start()
}

/// Read a shader source file, cleaning the prelude
pub fn load_source(path: &Path) -> Result<String, ShaderError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
        path: path.to_owned(),
        source,
    })?;
    Ok(clean_source(&raw).to_owned())
}

/// Create a shader module inside a validation error scope so a broken
/// shader surfaces its raw log instead of panicking later.
pub fn create_module(
    device: &wgpu::Device,
    name: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(name),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(ShaderError::Validation {
            name: name.to_owned(),
            log: err.to_string(),
        });
    }
    Ok(module)
}

/// Load and compile a shader file from the shader directory
pub fn load_module(
    device: &wgpu::Device,
    dir: &Path,
    file_name: &str,
) -> Result<wgpu::ShaderModule, ShaderError> {
    let source = load_source(&dir.join(file_name))?;
    create_module(device, file_name, &source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_source_strips_bom_and_leading_whitespace() {
        assert_eq!(clean_source("\u{feff}struct A {}"), "struct A {}");
        assert_eq!(clean_source("\n\t  struct A {}"), "struct A {}");
        assert_eq!(clean_source("\u{feff}\n  // c\nfn f() {}"), "// c\nfn f() {}");
        assert_eq!(clean_source("fn f() {}"), "fn f() {}");
    }

    #[test]
    fn missing_shader_reports_its_path() {
        let err = load_source(Path::new("/nonexistent/geodesic.wgsl")).unwrap_err();
        assert!(err.to_string().contains("geodesic.wgsl"));
    }

    #[test]
    fn shipped_shaders_are_present_and_clean() {
        let dir = crate::config::shader_dir();
        for name in ["geodesic.wgsl", "present.wgsl", "grid.wgsl"] {
            let source = load_source(&dir.join(name)).unwrap();
            assert!(!source.is_empty());
            assert_eq!(source, clean_source(&source));
        }
    }
}
