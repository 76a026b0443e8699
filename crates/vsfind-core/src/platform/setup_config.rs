/// Setup configuration service access for the modern scanner.
///
/// Wraps the `SetupConfiguration` COM class behind the [`SetupQuery`]
/// traits. COM stays initialized while any enumerator or instance handle is
/// alive; each handle releases its interface pointer on drop.
use super::com::{
    ComApartment, IEnumSetupInstances, ISetupConfiguration, ISetupInstance, ISetupInstance2,
    ISetupInstanceCatalog, ISetupPropertyStore, CLSID_SETUP_CONFIGURATION,
};
use crate::error::SourceError;
use crate::source::{InstanceEnumerator, PropertyStore, SetupInstance, SetupQuery};
use std::rc::Rc;
use windows::core::{Interface, BSTR, HRESULT, PCWSTR, VARIANT};
use windows::Win32::Foundation::{E_NOINTERFACE, REGDB_E_CLASSNOTREG, VARIANT_BOOL};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL, SAFEARRAY};
use windows::Win32::System::Ole::{
    SafeArrayDestroy, SafeArrayGetElement, SafeArrayGetLBound, SafeArrayGetUBound,
};

/// `E_NOTFOUND` (`HRESULT_FROM_WIN32(ERROR_NOT_FOUND)`).
const E_NOTFOUND: HRESULT = HRESULT(0x8007_0490_u32 as i32);

fn com_error(operation: &str, code: HRESULT) -> SourceError {
    if code == REGDB_E_CLASSNOTREG {
        SourceError::NotRegistered
    } else {
        SourceError::Com {
            operation: operation.to_string(),
            code: code.0 as u32,
        }
    }
}

fn check(operation: &str, hr: HRESULT) -> Result<(), SourceError> {
    if hr.is_ok() {
        Ok(())
    } else {
        Err(com_error(operation, hr))
    }
}

fn read_bstr(
    operation: &str,
    call: impl FnOnce(*mut BSTR) -> HRESULT,
) -> Result<String, SourceError> {
    let mut value = BSTR::new();
    check(operation, call(&mut value))?;
    Ok(value.to_string())
}

/// Entry point: the `SetupConfiguration` COM class.
#[derive(Debug, Default, Clone, Copy)]
pub struct SetupConfiguration;

impl SetupConfiguration {
    pub fn new() -> Self {
        Self
    }
}

impl SetupQuery for SetupConfiguration {
    type Instances = SetupInstanceEnumerator;

    fn enum_instances(&self) -> Result<SetupInstanceEnumerator, SourceError> {
        let apartment = Rc::new(ComApartment::enter());

        let config: ISetupConfiguration =
            unsafe { CoCreateInstance(&CLSID_SETUP_CONFIGURATION, None, CLSCTX_ALL) }
                .map_err(|e| com_error("CoCreateInstance(SetupConfiguration)", e.code()))?;

        let mut cursor: Option<IEnumSetupInstances> = None;
        check("EnumInstances", unsafe { config.EnumInstances(&mut cursor) })?;
        let cursor = cursor.ok_or_else(|| {
            SourceError::Unavailable("EnumInstances returned no enumerator".into())
        })?;

        Ok(SetupInstanceEnumerator {
            cursor,
            apartment,
        })
    }
}

/// Live `IEnumSetupInstances` cursor.
pub struct SetupInstanceEnumerator {
    // Declared before the apartment so it is released first.
    cursor: IEnumSetupInstances,
    apartment: Rc<ComApartment>,
}

impl InstanceEnumerator for SetupInstanceEnumerator {
    type Instance = SetupInstanceHandle;

    fn next_instance(&mut self) -> Result<Option<SetupInstanceHandle>, SourceError> {
        let mut slot: [Option<ISetupInstance>; 1] = [None];
        let mut fetched = 0u32;
        check("IEnumSetupInstances::Next", unsafe {
            self.cursor.Next(1, slot.as_mut_ptr(), &mut fetched)
        })?;

        let [instance] = slot;
        match (fetched, instance) {
            (0, _) | (_, None) => Ok(None),
            (_, Some(instance)) => {
                let instance2 = instance
                    .cast::<ISetupInstance2>()
                    .map_err(|e| com_error("QueryInterface(ISetupInstance2)", e.code()))?;
                Ok(Some(SetupInstanceHandle {
                    instance,
                    instance2,
                    apartment: Rc::clone(&self.apartment),
                }))
            }
        }
    }
}

/// One setup instance, held through both of its interfaces.
pub struct SetupInstanceHandle {
    instance: ISetupInstance,
    instance2: ISetupInstance2,
    apartment: Rc<ComApartment>,
}

impl SetupInstance for SetupInstanceHandle {
    type Properties = SetupPropertyStore;

    fn instance_id(&self) -> Result<String, SourceError> {
        read_bstr("GetInstanceId", |out| unsafe { self.instance.GetInstanceId(out) })
    }

    fn installation_path(&self) -> Result<String, SourceError> {
        read_bstr("GetInstallationPath", |out| unsafe {
            self.instance.GetInstallationPath(out)
        })
    }

    fn product_path(&self) -> Result<String, SourceError> {
        read_bstr("GetProductPath", |out| unsafe { self.instance2.GetProductPath(out) })
    }

    fn installation_version(&self) -> Result<String, SourceError> {
        read_bstr("GetInstallationVersion", |out| unsafe {
            self.instance.GetInstallationVersion(out)
        })
    }

    fn product_id(&self) -> Result<String, SourceError> {
        let mut product = None;
        check("GetProduct", unsafe { self.instance2.GetProduct(&mut product) })?;
        let product =
            product.ok_or_else(|| SourceError::Unavailable("instance has no product".into()))?;
        read_bstr("ISetupPackageReference::GetId", |out| unsafe { product.GetId(out) })
    }

    fn display_name(&self, lcid: u32) -> Result<String, SourceError> {
        read_bstr("GetDisplayName", |out| unsafe {
            self.instance.GetDisplayName(lcid, out)
        })
    }

    fn prerelease(&self) -> Result<Option<bool>, SourceError> {
        let catalog = match self.instance.cast::<ISetupInstanceCatalog>() {
            Ok(catalog) => catalog,
            Err(e) if e.code() == E_NOINTERFACE => return Ok(None),
            Err(e) => return Err(com_error("QueryInterface(ISetupInstanceCatalog)", e.code())),
        };

        let mut flag = VARIANT_BOOL::default();
        check("IsPrerelease", unsafe { catalog.IsPrerelease(&mut flag) })?;
        Ok(Some(flag.0 != 0))
    }

    fn properties(&self) -> Result<Option<SetupPropertyStore>, SourceError> {
        let mut store = None;
        let hr = unsafe { self.instance2.GetProperties(&mut store) };
        if hr == E_NOTFOUND {
            return Ok(None);
        }
        check("GetProperties", hr)?;
        Ok(store.map(|store| SetupPropertyStore {
            store,
            _apartment: Rc::clone(&self.apartment),
        }))
    }
}

/// One `ISetupPropertyStore`.
pub struct SetupPropertyStore {
    store: ISetupPropertyStore,
    _apartment: Rc<ComApartment>,
}

impl PropertyStore for SetupPropertyStore {
    fn names(&self) -> Result<Vec<String>, SourceError> {
        let mut array: *mut SAFEARRAY = std::ptr::null_mut();
        check("GetNames", unsafe { self.store.GetNames(&mut array) })?;
        if array.is_null() {
            return Ok(Vec::new());
        }
        let array = OwnedSafeArray(array);
        array.bstrs()
    }

    fn value(&self, name: &str) -> Result<Option<String>, SourceError> {
        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        let mut value = VARIANT::default();
        let hr = unsafe { self.store.GetValue(PCWSTR(wide.as_ptr()), &mut value) };
        if hr == E_NOTFOUND {
            return Ok(None);
        }
        check("ISetupPropertyStore::GetValue", hr)?;
        if value.is_empty() {
            return Ok(None);
        }
        let text = BSTR::try_from(&value).map_err(|e| com_error("VARIANT to BSTR", e.code()))?;
        Ok(Some(text.to_string()))
    }
}

/// A one-dimensional `SAFEARRAY` destroyed on drop.
struct OwnedSafeArray(*mut SAFEARRAY);

impl OwnedSafeArray {
    fn bstrs(&self) -> Result<Vec<String>, SourceError> {
        let lower = unsafe { SafeArrayGetLBound(self.0, 1) }
            .map_err(|e| com_error("SafeArrayGetLBound", e.code()))?;
        let upper = unsafe { SafeArrayGetUBound(self.0, 1) }
            .map_err(|e| com_error("SafeArrayGetUBound", e.code()))?;

        let mut names = Vec::new();
        for index in lower..=upper {
            let mut element = BSTR::new();
            unsafe {
                SafeArrayGetElement(self.0, &index, (&mut element as *mut BSTR).cast())
            }
            .map_err(|e| com_error("SafeArrayGetElement", e.code()))?;
            names.push(element.to_string());
        }
        Ok(names)
    }
}

impl Drop for OwnedSafeArray {
    fn drop(&mut self) {
        unsafe {
            let _ = SafeArrayDestroy(self.0);
        }
    }
}
