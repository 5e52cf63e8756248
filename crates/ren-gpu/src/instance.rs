//! Vulkan instance creation.

use std::ffi::{c_char, c_void, CStr, CString};

use ash::vk;
use raw_window_handle::RawDisplayHandle;

use crate::error::{GpuError, Result};

/// Khronos validation layer requested when validation is enabled.
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Engine name reported to the driver.
const ENGINE_NAME: &CStr = c"ren";

/// Instance-stage settings.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    /// Application name reported to the driver.
    pub application_name: String,
    /// Extra instance extensions on top of the platform presentation ones.
    pub extensions: Vec<String>,
    /// Request the validation layer and register a debug messenger.
    pub enable_validation: bool,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            application_name: "ren".to_string(),
            extensions: Vec::new(),
            enable_validation: cfg!(debug_assertions),
        }
    }
}

/// Owned Vulkan instance with its loader and optional debug messenger.
pub struct VulkanInstance {
    // Entry must outlive every loader created from it
    entry: ash::Entry,
    instance: ash::Instance,
    surface_loader: ash::khr::surface::Instance,
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    extensions: Vec<CString>,
}

impl VulkanInstance {
    /// Load the Vulkan library and create an instance able to present to `display`.
    pub fn new(config: &InstanceConfig, display: RawDisplayHandle) -> Result<Self> {
        // SAFETY: loading the system Vulkan library has no preconditions beyond
        // the library itself being well-formed.
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::LoaderUnavailable(e.to_string()))?;

        let extensions = merge_extensions(
            &platform_extensions(display)?,
            &to_cstrings(&config.extensions)?,
            config.enable_validation,
        );

        // SAFETY: entry was loaded above.
        let available = unsafe { entry.enumerate_instance_extension_properties(None)? };
        let available: Vec<CString> = available
            .iter()
            // SAFETY: the driver returns NUL-terminated fixed-size names
            .map(|props| unsafe { CStr::from_ptr(props.extension_name.as_ptr()) }.to_owned())
            .collect();
        if let Some(missing) = first_missing(&extensions, &available) {
            return Err(GpuError::ExtensionUnavailable(
                missing.to_string_lossy().into_owned(),
            ));
        }

        let layers: Vec<CString> = if config.enable_validation {
            // SAFETY: entry was loaded above.
            let available = unsafe { entry.enumerate_instance_layer_properties()? };
            let available: Vec<CString> = available
                .iter()
                // SAFETY: the driver returns NUL-terminated fixed-size names
                .map(|props| unsafe { CStr::from_ptr(props.layer_name.as_ptr()) }.to_owned())
                .collect();
            let requested = vec![VALIDATION_LAYER.to_owned()];
            if let Some(missing) = first_missing(&requested, &available) {
                return Err(GpuError::LayerUnavailable(
                    missing.to_string_lossy().into_owned(),
                ));
            }
            requested
        } else {
            Vec::new()
        };

        let app_name = CString::new(config.application_name.as_str())
            .unwrap_or_else(|_| ENGINE_NAME.to_owned());
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(ENGINE_NAME)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let extension_names: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
        let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        // Required for MoltenVK on macOS
        #[cfg(target_os = "macos")]
        let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        #[cfg(not(target_os = "macos"))]
        let create_flags = vk::InstanceCreateFlags::empty();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names)
            .flags(create_flags);

        // SAFETY: every pointer in create_info refers to locals alive for this call.
        let instance = unsafe { entry.create_instance(&create_info, None) }.map_err(|e| match e {
            vk::Result::ERROR_LAYER_NOT_PRESENT => {
                GpuError::LayerUnavailable(VALIDATION_LAYER.to_string_lossy().into_owned())
            }
            vk::Result::ERROR_EXTENSION_NOT_PRESENT => {
                GpuError::ExtensionUnavailable(format!("{extensions:?}"))
            }
            other => GpuError::Vulkan(other),
        })?;

        let debug = if config.enable_validation {
            match create_debug_messenger(&entry, &instance) {
                Ok(debug) => Some(debug),
                Err(e) => {
                    // SAFETY: nothing has been created from the instance yet.
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        tracing::info!(
            application = %config.application_name,
            validation = config.enable_validation,
            extensions = extensions.len(),
            "Vulkan instance created"
        );

        Ok(Self {
            entry,
            instance,
            surface_loader,
            debug,
            extensions,
        })
    }

    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }

    /// Whether a debug messenger is registered.
    pub fn validation_enabled(&self) -> bool {
        self.debug.is_some()
    }

    /// Extensions enabled on this instance, in request order.
    pub fn enabled_extensions(&self) -> &[CString] {
        &self.extensions
    }

    /// Destroy the debug messenger and the instance.
    ///
    /// # Safety
    /// Every surface and device created from this instance must already be destroyed.
    pub unsafe fn destroy(self) {
        // SAFETY: caller guarantees no child objects remain.
        unsafe {
            if let Some((debug_utils, messenger)) = &self.debug {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        tracing::debug!("Vulkan instance destroyed");
    }
}

/// Presentation extensions the platform needs for `display`.
pub fn platform_extensions(display: RawDisplayHandle) -> Result<Vec<&'static CStr>> {
    let names = ash_window::enumerate_required_extensions(display)
        .map_err(|e| {
            GpuError::ExtensionUnavailable(format!("no surface extensions for display: {e}"))
        })?;

    let mut extensions: Vec<&'static CStr> = names
        .iter()
        // SAFETY: ash-window returns pointers to static NUL-terminated names.
        .map(|&name| unsafe { CStr::from_ptr(name) })
        .collect();

    if cfg!(target_os = "macos") {
        extensions.push(ash::khr::portability_enumeration::NAME);
    }

    Ok(extensions)
}

/// Merge platform, caller and debug extensions, keeping the first occurrence of each.
pub fn merge_extensions(
    platform: &[&CStr],
    extra: &[CString],
    enable_validation: bool,
) -> Vec<CString> {
    let debug = enable_validation.then_some(ash::ext::debug_utils::NAME);

    let mut merged: Vec<CString> = Vec::with_capacity(platform.len() + extra.len() + 1);
    let candidates = platform
        .iter()
        .copied()
        .chain(extra.iter().map(CString::as_c_str))
        .chain(debug);
    for name in candidates {
        if !merged.iter().any(|m| m.as_c_str() == name) {
            merged.push(name.to_owned());
        }
    }
    merged
}

/// First requested name missing from `available`.
pub fn first_missing<'a>(requested: &'a [CString], available: &[CString]) -> Option<&'a CStr> {
    requested
        .iter()
        .find(|name| !available.contains(name))
        .map(CString::as_c_str)
}

/// Convert configured names into C strings.
pub(crate) fn to_cstrings(names: &[String]) -> Result<Vec<CString>> {
    names
        .iter()
        .map(|name| {
            CString::new(name.as_str()).map_err(|_| GpuError::ExtensionUnavailable(name.clone()))
        })
        .collect()
}

fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));

    // SAFETY: the instance was created with VK_EXT_debug_utils enabled.
    let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None)? };

    Ok((debug_utils, messenger))
}

/// Tracing level for a validation message; verbose output lands on debug.
fn validation_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> tracing::Level {
    match severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => tracing::Level::ERROR,
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => tracing::Level::WARN,
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    }
}

/// Forwards validation messages to tracing.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    // SAFETY: the loader passes a valid callback data pointer for the duration of the call.
    let p_message = unsafe { (*p_callback_data).p_message };
    if p_message.is_null() {
        return vk::FALSE;
    }
    // SAFETY: p_message is a NUL-terminated string owned by the loader.
    let message = unsafe { CStr::from_ptr(p_message) }.to_string_lossy();

    match validation_level(message_severity) {
        tracing::Level::ERROR => {
            tracing::error!(target: "ren_gpu::validation", ?message_type, "{message}");
        }
        tracing::Level::WARN => {
            tracing::warn!(target: "ren_gpu::validation", ?message_type, "{message}");
        }
        tracing::Level::INFO => {
            tracing::info!(target: "ren_gpu::validation", ?message_type, "{message}");
        }
        _ => {
            tracing::debug!(target: "ren_gpu::validation", ?message_type, "{message}");
        }
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&CStr]) -> Vec<CString> {
        list.iter().map(|&n| n.to_owned()).collect()
    }

    #[test]
    fn merge_keeps_platform_first_then_extra() {
        let merged = merge_extensions(
            &[c"VK_KHR_surface", c"VK_KHR_xlib_surface"],
            &names(&[c"VK_KHR_get_surface_capabilities2"]),
            false,
        );
        assert_eq!(
            merged,
            names(&[
                c"VK_KHR_surface",
                c"VK_KHR_xlib_surface",
                c"VK_KHR_get_surface_capabilities2",
            ])
        );
    }

    #[test]
    fn merge_adds_debug_utils_only_with_validation() {
        let without = merge_extensions(&[c"VK_KHR_surface"], &[], false);
        assert!(!without.iter().any(|e| e.as_c_str() == ash::ext::debug_utils::NAME));

        let with = merge_extensions(&[c"VK_KHR_surface"], &[], true);
        assert_eq!(with.last().map(CString::as_c_str), Some(ash::ext::debug_utils::NAME));
    }

    #[test]
    fn merge_removes_duplicates() {
        let merged = merge_extensions(
            &[c"VK_KHR_surface"],
            &names(&[c"VK_KHR_surface", c"VK_EXT_debug_utils"]),
            true,
        );
        assert_eq!(merged, names(&[c"VK_KHR_surface", c"VK_EXT_debug_utils"]));
    }

    #[test]
    fn first_missing_reports_in_request_order() {
        let requested = names(&[
            c"VK_KHR_surface",
            c"VK_KHR_wayland_surface",
            c"VK_EXT_debug_utils",
        ]);
        let available = names(&[c"VK_KHR_surface", c"VK_EXT_debug_utils"]);
        assert_eq!(
            first_missing(&requested, &available),
            Some(c"VK_KHR_wayland_surface")
        );
        assert_eq!(first_missing(&requested[..1], &available), None);
    }

    #[test]
    fn validation_severity_maps_to_tracing_level() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as Severity;

        assert_eq!(validation_level(Severity::ERROR), tracing::Level::ERROR);
        assert_eq!(validation_level(Severity::WARNING), tracing::Level::WARN);
        assert_eq!(validation_level(Severity::INFO), tracing::Level::INFO);
        assert_eq!(validation_level(Severity::VERBOSE), tracing::Level::DEBUG);
    }

    #[test]
    fn interior_nul_is_rejected() {
        let err = to_cstrings(&["VK_bad\0name".to_string()]).unwrap_err();
        assert!(matches!(err, GpuError::ExtensionUnavailable(_)));
    }

    #[test]
    fn default_config_names_application() {
        let config = InstanceConfig::default();
        assert_eq!(config.application_name, "ren");
        assert!(config.extensions.is_empty());
        assert_eq!(config.enable_validation, cfg!(debug_assertions));
    }
}
