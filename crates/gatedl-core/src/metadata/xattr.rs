//! Extended-attribute backend (Linux `user.*` namespace via libc).

use std::io;
use std::path::Path;

use super::AttributeStore;
use crate::error::{GatedlError, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct XattrStore;

impl XattrStore {
    pub fn supported() -> bool {
        cfg!(target_os = "linux")
    }
}

fn meta_err(path: &Path, source: io::Error) -> GatedlError {
    GatedlError::Metadata {
        path: path.to_path_buf(),
        source,
    }
}

impl AttributeStore for XattrStore {
    fn get(&self, path: &Path, key: &str) -> Result<Option<String>> {
        let raw = sys::get(path, key).map_err(|e| meta_err(path, e))?;
        Ok(raw.map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    fn set(&self, path: &Path, key: &str, value: &str) -> Result<()> {
        sys::set(path, key, value.as_bytes()).map_err(|e| meta_err(path, e))
    }

    fn remove(&self, path: &Path, key: &str) -> Result<()> {
        sys::remove(path, key).map_err(|e| meta_err(path, e))
    }
}

#[cfg(target_os = "linux")]
mod sys {
    use std::ffi::CString;
    use std::io;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    fn c_args(path: &Path, key: &str) -> io::Result<(CString, CString)> {
        Ok((
            CString::new(path.as_os_str().as_bytes())?,
            CString::new(key)?,
        ))
    }

    fn is_missing_attr(err: &io::Error) -> bool {
        err.raw_os_error() == Some(libc::ENODATA)
    }

    pub(super) fn get(path: &Path, key: &str) -> io::Result<Option<Vec<u8>>> {
        let (p, k) = c_args(path, key)?;
        loop {
            let size = unsafe { libc::getxattr(p.as_ptr(), k.as_ptr(), std::ptr::null_mut(), 0) };
            if size < 0 {
                let err = io::Error::last_os_error();
                return if is_missing_attr(&err) { Ok(None) } else { Err(err) };
            }
            let mut buf = vec![0u8; size as usize];
            let n = unsafe {
                libc::getxattr(
                    p.as_ptr(),
                    k.as_ptr(),
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                // Value grew between the two calls; size it again.
                if err.raw_os_error() == Some(libc::ERANGE) {
                    continue;
                }
                return if is_missing_attr(&err) { Ok(None) } else { Err(err) };
            }
            buf.truncate(n as usize);
            return Ok(Some(buf));
        }
    }

    pub(super) fn set(path: &Path, key: &str, value: &[u8]) -> io::Result<()> {
        let (p, k) = c_args(path, key)?;
        let r = unsafe {
            libc::setxattr(
                p.as_ptr(),
                k.as_ptr(),
                value.as_ptr() as *const libc::c_void,
                value.len(),
                0,
            )
        };
        if r < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub(super) fn remove(path: &Path, key: &str) -> io::Result<()> {
        let (p, k) = c_args(path, key)?;
        let r = unsafe { libc::removexattr(p.as_ptr(), k.as_ptr()) };
        if r < 0 {
            let err = io::Error::last_os_error();
            if !is_missing_attr(&err) {
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
mod sys {
    use std::io;
    use std::path::Path;

    fn unsupported() -> io::Error {
        io::Error::new(io::ErrorKind::Unsupported, "extended attributes not supported")
    }

    pub(super) fn get(_path: &Path, _key: &str) -> io::Result<Option<Vec<u8>>> {
        Err(unsupported())
    }

    pub(super) fn set(_path: &Path, _key: &str, _value: &[u8]) -> io::Result<()> {
        Err(unsupported())
    }

    pub(super) fn remove(_path: &Path, _key: &str) -> io::Result<()> {
        Err(unsupported())
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    /// tmpfs on older kernels rejects user xattrs; such hosts skip the test.
    fn xattrs_unavailable(err: &GatedlError) -> bool {
        match err {
            GatedlError::Metadata { source, .. } => {
                source.raw_os_error() == Some(libc::EOPNOTSUPP)
                    || source.raw_os_error() == Some(libc::ENOTSUP)
            }
            _ => false,
        }
    }

    #[test]
    fn set_get_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("foo.pkg");
        std::fs::write(&p, b"x").unwrap();
        let s = XattrStore;
        if let Err(e) = s.set(&p, "user.gatedl.etag", "\"abc123\"") {
            assert!(xattrs_unavailable(&e), "unexpected error: {}", e);
            return;
        }
        assert_eq!(
            s.get(&p, "user.gatedl.etag").unwrap().as_deref(),
            Some("\"abc123\"")
        );
        s.remove(&p, "user.gatedl.etag").unwrap();
        assert_eq!(s.get(&p, "user.gatedl.etag").unwrap(), None);
        s.remove(&p, "user.gatedl.etag").unwrap();
    }

    #[test]
    fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(XattrStore.get(&dir.path().join("nope"), "user.x").is_err());
    }
}
