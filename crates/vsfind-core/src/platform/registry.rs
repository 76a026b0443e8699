/// Read-only registry access for the legacy scanner.
///
/// Each [`RegistryKey`] owns an open `HKEY` and closes it on drop.
use crate::error::SourceError;
use crate::source::{ConfigKey, ConfigStore};
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{
    ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS, WIN32_ERROR,
};
use windows::Win32::System::Registry::{
    RegCloseKey, RegEnumKeyExW, RegOpenKeyExW, RegQueryValueExW, HKEY, HKEY_LOCAL_MACHINE,
    KEY_READ, KEY_WOW64_32KEY, REG_EXPAND_SZ, REG_SAM_FLAGS, REG_SZ,
    REG_VALUE_TYPE,
};

/// Longest registry key name, plus the terminating null.
const MAX_KEY_NAME: usize = 256;

/// `HKEY_LOCAL_MACHINE` seen through a fixed registry view.
#[derive(Debug, Clone, Copy)]
pub struct RegistryStore {
    view: REG_SAM_FLAGS,
}

impl RegistryStore {
    /// The 32-bit view, where the legacy products register themselves.
    pub fn machine_32bit() -> Self {
        Self {
            view: KEY_WOW64_32KEY,
        }
    }
}

impl ConfigStore for RegistryStore {
    type Key = RegistryKey;

    fn open(&self, path: &str) -> Result<Option<RegistryKey>, SourceError> {
        open_key(HKEY_LOCAL_MACHINE, path, self.view)
    }
}

/// An open registry key.
#[derive(Debug)]
pub struct RegistryKey {
    hkey: HKEY,
    view: REG_SAM_FLAGS,
}

impl Drop for RegistryKey {
    fn drop(&mut self) {
        unsafe {
            let _ = RegCloseKey(self.hkey);
        }
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn registry_error(operation: impl Into<String>, status: WIN32_ERROR) -> SourceError {
    SourceError::Registry {
        operation: operation.into(),
        code: status.0,
    }
}

fn open_key(
    parent: HKEY,
    path: &str,
    view: REG_SAM_FLAGS,
) -> Result<Option<RegistryKey>, SourceError> {
    let wide = to_wide(path);
    let mut hkey = HKEY::default();
    let status =
        unsafe { RegOpenKeyExW(parent, PCWSTR(wide.as_ptr()), 0, KEY_READ | view, &mut hkey) };

    match status {
        ERROR_SUCCESS => Ok(Some(RegistryKey { hkey, view })),
        ERROR_FILE_NOT_FOUND => Ok(None),
        other => Err(registry_error(format!("RegOpenKeyExW({path})"), other)),
    }
}

impl ConfigKey for RegistryKey {
    fn subkey_names(&self) -> Result<Vec<String>, SourceError> {
        let mut names = Vec::new();
        let mut buffer = [0u16; MAX_KEY_NAME];

        for index in 0u32.. {
            let mut len = buffer.len() as u32;
            let status = unsafe {
                RegEnumKeyExW(
                    self.hkey,
                    index,
                    PWSTR(buffer.as_mut_ptr()),
                    &mut len,
                    None,
                    PWSTR::null(),
                    None,
                    None,
                )
            };

            match status {
                ERROR_SUCCESS => names.push(String::from_utf16_lossy(&buffer[..len as usize])),
                ERROR_NO_MORE_ITEMS => break,
                other => return Err(registry_error("RegEnumKeyExW", other)),
            }
        }

        Ok(names)
    }

    fn open_subkey(&self, path: &str) -> Result<Option<RegistryKey>, SourceError> {
        open_key(self.hkey, path, self.view)
    }

    fn string_value(&self, name: &str) -> Result<Option<String>, SourceError> {
        let wide = to_wide(name);
        let mut kind = REG_VALUE_TYPE::default();
        let mut size = 0u32;

        // First call sizes the buffer.
        let status = unsafe {
            RegQueryValueExW(
                self.hkey,
                PCWSTR(wide.as_ptr()),
                None,
                Some(&mut kind),
                None,
                Some(&mut size),
            )
        };
        match status {
            ERROR_SUCCESS | ERROR_MORE_DATA => {}
            ERROR_FILE_NOT_FOUND => return Ok(None),
            other => return Err(registry_error(format!("RegQueryValueExW({name})"), other)),
        }

        if kind != REG_SZ && kind != REG_EXPAND_SZ {
            tracing::debug!("Registry value {name} is not a string (type {})", kind.0);
            return Ok(None);
        }

        let mut buffer = vec![0u16; (size as usize).div_ceil(2)];
        let status = unsafe {
            RegQueryValueExW(
                self.hkey,
                PCWSTR(wide.as_ptr()),
                None,
                Some(&mut kind),
                Some(buffer.as_mut_ptr().cast::<u8>()),
                Some(&mut size),
            )
        };
        if status != ERROR_SUCCESS {
            return Err(registry_error(format!("RegQueryValueExW({name})"), status));
        }

        let len = (size as usize / 2).min(buffer.len());
        let text = &buffer[..len];
        let end = text.iter().position(|&c| c == 0).unwrap_or(text.len());
        Ok(Some(String::from_utf16_lossy(&text[..end])))
    }
}
