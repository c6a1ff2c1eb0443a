/// Options for loading a glTF asset.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Log members that are present in the document but not supported
    /// (extensions, extras, sparse accessors, skins, cameras, animations).
    pub log_unsupported: bool,
    /// Decode embedded images in parallel.
    pub parallel_images: bool,
    /// Size of a dedicated image worker pool. Zero uses rayon's global pool.
    pub image_workers: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            log_unsupported: true,
            parallel_images: true,
            image_workers: 0,
        }
    }
}

impl LoadConfig {
    /// Dedicated pool for image decoding, or `None` to use the global pool.
    pub fn image_pool(&self) -> Option<Result<rayon::ThreadPool, rayon::ThreadPoolBuildError>> {
        if self.image_workers == 0 {
            return None;
        }
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.image_workers)
                .thread_name(|i| format!("vista-image-{i}"))
                .build(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_global_pool() {
        assert!(LoadConfig::default().image_pool().is_none());
    }

    #[test]
    fn dedicated_pool_has_requested_size() {
        let config = LoadConfig {
            image_workers: 3,
            ..Default::default()
        };
        let pool = config.image_pool().unwrap().unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }
}
