//! Application configuration, optionally loaded from a TOML file.

use std::path::Path;

use anyhow::Context;
use ren_gpu::ContextBuilder;
use ren_platform::PlatformConfig;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowSettings,
    pub gpu: GpuSettings,
}

/// `[window]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Window title, also reported to the driver as the application name.
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "ren".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

/// `[gpu]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GpuSettings {
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Force FIFO presentation.
    pub vsync: bool,
    /// Preferred swapchain image count.
    pub image_count: Option<u32>,
    pub instance_extensions: Vec<String>,
    pub device_extensions: Vec<String>,
}

impl Default for GpuSettings {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            vsync: false,
            image_count: None,
            instance_extensions: Vec::new(),
            device_extensions: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.window.title = title.into();
        config
    }

    /// Load configuration from `path`. A missing file yields defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Enable or disable vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.gpu.vsync = vsync;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.gpu.validation = validation;
        self
    }

    pub fn platform_config(&self) -> PlatformConfig {
        PlatformConfig {
            title: self.window.title.clone(),
            width: self.window.width,
            height: self.window.height,
            resizable: self.window.resizable,
        }
    }

    /// Context builder for a window of `width` x `height`.
    pub fn context_builder(&self, width: u32, height: u32) -> ContextBuilder {
        let mut builder = ContextBuilder::new()
            .app_name(&self.window.title)
            .validation(self.gpu.validation)
            .vsync(self.gpu.vsync)
            .extent(width, height);
        if let Some(count) = self.gpu.image_count {
            builder = builder.image_count(count);
        }
        for ext in &self.gpu.instance_extensions {
            builder = builder.instance_extension(ext);
        }
        for ext in &self.gpu.device_extensions {
            builder = builder.device_extension(ext);
        }
        builder
    }
}
