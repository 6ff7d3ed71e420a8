use std::path::{Path, PathBuf};

use crate::errors::*;

/// Expands a leading `~` to the current user's home directory.
///
/// Only `~` and `~/...` are expanded; `~user/...` is returned unchanged.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    expand_home_with(path, dirs::home_dir)
}

pub(crate) fn expand_home_with<F>(path: &str, home_dir: F) -> Result<PathBuf>
where
    F: FnOnce() -> Option<PathBuf>,
{
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return Ok(PathBuf::from(path)),
    };
    let home = home_dir().ok_or_else(|| GpkgError::NoHomeDirectory {
        path: path.to_string(),
    })?;
    let rest = rest.trim_start_matches(['/', '\\']);
    if rest.is_empty() {
        Ok(home)
    } else {
        Ok(home.join(rest))
    }
}

/// Fails with [`GpkgError::FileNotFound`] unless `path` is a readable file.
pub(crate) fn ensure_readable(path: &Path) -> Result<()> {
    std::fs::File::open(path)
        .and_then(|file| file.metadata())
        .and_then(|meta| {
            if meta.is_file() {
                Ok(())
            } else {
                Err(std::io::Error::other("not a regular file"))
            }
        })
        .map_err(|source| GpkgError::FileNotFound {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(feature = "ogr")]
pub(crate) use self::ffi::*;

#[cfg(feature = "ogr")]
mod ffi {
    use std::ffi::{c_char, CStr, CString};
    use std::path::Path;

    use crate::errors::*;

    pub fn _string(raw_ptr: *const c_char) -> Option<String> {
        if raw_ptr.is_null() {
            return None;
        }
        let c_str = unsafe { CStr::from_ptr(raw_ptr) };
        Some(c_str.to_string_lossy().into_owned())
    }

    pub fn _last_null_pointer_err(method_name: &'static str) -> GpkgError {
        let last_err_msg = _string(unsafe { gdal_sys::CPLGetLastErrorMsg() }).unwrap_or_default();
        unsafe { gdal_sys::CPLErrorReset() };
        GpkgError::NullPointer {
            method_name,
            msg: last_err_msg,
        }
    }

    pub fn _path_to_c_string(path: &Path) -> Result<CString> {
        let path_str = path.to_string_lossy();
        CString::new(path_str.as_ref()).map_err(Into::into)
    }
}
