/// COM declarations for the Visual Studio setup configuration API.
///
/// The interfaces are not part of the Windows SDK metadata, so they are
/// declared here with `#[interface]`. Every vtable slot is listed in order,
/// including the ones this crate never calls.
use windows::Win32::Foundation::{FILETIME, VARIANT_BOOL};
use windows::Win32::System::Com::{
    CoInitializeEx, CoUninitialize, COINIT_MULTITHREADED, SAFEARRAY,
};
use windows_core::{interface, IUnknown, IUnknown_Vtbl, BSTR, GUID, HRESULT, PCWSTR, VARIANT};

/// `SetupConfiguration` coclass.
pub const CLSID_SETUP_CONFIGURATION: GUID =
    GUID::from_u128(0x177f0c4a_1cd3_4de7_a32c_71dbbb9fa36d);

#[interface("42843719-DB4C-46C2-8E7C-64F1816EFD5B")]
pub unsafe trait ISetupConfiguration: IUnknown {
    fn EnumInstances(&self, ppenuminstances: *mut Option<IEnumSetupInstances>) -> HRESULT;
    fn GetInstanceForCurrentProcess(&self, ppinstance: *mut Option<ISetupInstance>) -> HRESULT;
    fn GetInstanceForPath(&self, wzpath: PCWSTR, ppinstance: *mut Option<ISetupInstance>)
        -> HRESULT;
}

#[interface("6380BCFF-41D3-4B2E-8B2E-BF8A6810C848")]
pub unsafe trait IEnumSetupInstances: IUnknown {
    fn Next(
        &self,
        celt: u32,
        rgelt: *mut Option<ISetupInstance>,
        pceltfetched: *mut u32,
    ) -> HRESULT;
    fn Skip(&self, celt: u32) -> HRESULT;
    fn Reset(&self) -> HRESULT;
    fn Clone(&self, ppenum: *mut Option<IEnumSetupInstances>) -> HRESULT;
}

#[interface("B41463C3-8866-43B5-BC33-2B0676F7F42E")]
pub unsafe trait ISetupInstance: IUnknown {
    fn GetInstanceId(&self, pbstrinstanceid: *mut BSTR) -> HRESULT;
    fn GetInstallDate(&self, pinstalldate: *mut FILETIME) -> HRESULT;
    fn GetInstallationName(&self, pbstrinstallationname: *mut BSTR) -> HRESULT;
    fn GetInstallationPath(&self, pbstrinstallationpath: *mut BSTR) -> HRESULT;
    fn GetInstallationVersion(&self, pbstrinstallationversion: *mut BSTR) -> HRESULT;
    fn GetDisplayName(&self, lcid: u32, pbstrdisplayname: *mut BSTR) -> HRESULT;
    fn GetDescription(&self, lcid: u32, pbstrdescription: *mut BSTR) -> HRESULT;
    fn ResolvePath(&self, pwszrelativepath: PCWSTR, pbstrabsolutepath: *mut BSTR) -> HRESULT;
}

#[interface("89143C9A-05AF-49B0-B717-72E218A2185C")]
pub unsafe trait ISetupInstance2: ISetupInstance {
    fn GetState(&self, pstate: *mut u32) -> HRESULT;
    fn GetPackages(&self, ppspackages: *mut *mut SAFEARRAY) -> HRESULT;
    fn GetProduct(&self, ppackage: *mut Option<ISetupPackageReference>) -> HRESULT;
    fn GetProductPath(&self, pbstrproductpath: *mut BSTR) -> HRESULT;
    fn GetErrors(&self, pperrorstate: *mut Option<IUnknown>) -> HRESULT;
    fn IsLaunchable(&self, pfislaunchable: *mut VARIANT_BOOL) -> HRESULT;
    fn IsComplete(&self, pfiscomplete: *mut VARIANT_BOOL) -> HRESULT;
    fn GetProperties(&self, ppproperties: *mut Option<ISetupPropertyStore>) -> HRESULT;
    fn GetEnginePath(&self, pbstrenginepath: *mut BSTR) -> HRESULT;
}

#[interface("9AD8E40F-39A2-40F1-BF64-0A6C50DD9EEB")]
pub unsafe trait ISetupInstanceCatalog: IUnknown {
    fn GetCatalogInfo(&self, ppcataloginfo: *mut Option<ISetupPropertyStore>) -> HRESULT;
    fn IsPrerelease(&self, pfisprerelease: *mut VARIANT_BOOL) -> HRESULT;
}

#[interface("DA8D8A16-B2B6-4487-A2F1-594CCCCD6BF5")]
pub unsafe trait ISetupPackageReference: IUnknown {
    fn GetId(&self, pbstrid: *mut BSTR) -> HRESULT;
    fn GetVersion(&self, pbstrversion: *mut BSTR) -> HRESULT;
    fn GetChip(&self, pbstrchip: *mut BSTR) -> HRESULT;
    fn GetLanguage(&self, pbstrlanguage: *mut BSTR) -> HRESULT;
    fn GetBranch(&self, pbstrbranch: *mut BSTR) -> HRESULT;
    fn GetType(&self, pbstrtype: *mut BSTR) -> HRESULT;
    fn GetUniqueId(&self, pbstruniqueid: *mut BSTR) -> HRESULT;
    fn GetIsExtension(&self, pfisextension: *mut VARIANT_BOOL) -> HRESULT;
}

#[interface("C601C175-A3BE-44BC-91F6-4568D230FC83")]
pub unsafe trait ISetupPropertyStore: IUnknown {
    fn GetNames(&self, ppsznames: *mut *mut SAFEARRAY) -> HRESULT;
    fn GetValue(&self, pwszname: PCWSTR, pvtvalue: *mut VARIANT) -> HRESULT;
}

/// Keeps COM initialized on the current thread for as long as it lives.
///
/// Only uninitializes if this guard's own `CoInitializeEx` succeeded; a
/// thread already in a different apartment mode is used as-is.
#[derive(Debug)]
pub struct ComApartment {
    owned: bool,
}

impl ComApartment {
    pub fn enter() -> Self {
        let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
        if hr.is_err() {
            tracing::debug!("CoInitializeEx returned {:#010x}; using existing apartment", hr.0);
        }
        Self { owned: hr.is_ok() }
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.owned {
            unsafe { CoUninitialize() };
        }
    }
}
