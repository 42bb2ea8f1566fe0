//! Convenience spawning keyed by semantic category: effects, audio voices and
//! UI notifications.

use ember_core::ParentId;
use glam::{Quat, Vec3};

use crate::instance::{InstanceHandle, Poolable, PrototypeRef};
use crate::manager::PoolManager;

/// Semantic category of a pooled object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolCategory {
    /// Visual effects such as particles and impacts.
    Effect,
    /// One-shot audio voices.
    Audio,
    /// UI popups and floating notifications.
    Notification,
}

impl PoolCategory {
    /// Prefix used in pool names.
    pub fn prefix(self) -> &'static str {
        match self {
            PoolCategory::Effect => "effect",
            PoolCategory::Audio => "audio",
            PoolCategory::Notification => "notification",
        }
    }

    /// Pool name for `name` within this category, e.g. `effect/Spark`.
    pub fn key(self, name: &str) -> String {
        format!("{}/{name}", self.prefix())
    }
}

impl<T: Poolable> PoolManager<T> {
    /// Register a prototype under a category; its pool is created on first use.
    pub fn register_category_prototype(
        &mut self,
        category: PoolCategory,
        name: &str,
        prototype: PrototypeRef<T>,
    ) {
        self.register_prototype(category.key(name), prototype);
    }

    /// Spawn the effect `name` at `position`, released after `lifetime`
    /// seconds when positive.
    pub fn spawn_effect(
        &mut self,
        name: &str,
        position: Vec3,
        lifetime: f64,
    ) -> Option<InstanceHandle> {
        self.spawn_timed(PoolCategory::Effect, name, position, None, lifetime)
    }

    /// Play the audio clip `clip` at `position` for `duration` seconds.
    pub fn play_audio(
        &mut self,
        clip: &str,
        position: Vec3,
        duration: f64,
    ) -> Option<InstanceHandle> {
        self.spawn_timed(PoolCategory::Audio, clip, position, None, duration)
    }

    /// Show a notification of `kind` under `parent` for `lifetime` seconds.
    pub fn show_notification(
        &mut self,
        kind: &str,
        parent: Option<ParentId>,
        lifetime: f64,
    ) -> Option<InstanceHandle> {
        self.spawn_timed(PoolCategory::Notification, kind, Vec3::ZERO, parent, lifetime)
    }

    fn spawn_timed(
        &mut self,
        category: PoolCategory,
        name: &str,
        position: Vec3,
        parent: Option<ParentId>,
        lifetime: f64,
    ) -> Option<InstanceHandle> {
        let handle = self.spawn(&category.key(name), position, Quat::IDENTITY, parent)?;
        if lifetime > 0.0 {
            self.release_after(handle, lifetime);
        }
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::prototype;
    use ember_config::PoolConfig;

    #[derive(Default)]
    struct Voice {
        playing: bool,
    }

    impl Poolable for Voice {
        fn on_spawn(&mut self) {
            self.playing = true;
        }

        fn on_return(&mut self) {
            self.playing = false;
        }
    }

    #[test]
    fn test_category_keys() {
        assert_eq!(PoolCategory::Effect.key("Spark"), "effect/Spark");
        assert_eq!(PoolCategory::Audio.key("hit"), "audio/hit");
        assert_eq!(PoolCategory::Notification.key("levelup"), "notification/levelup");
    }

    #[test]
    fn test_play_audio_releases_after_duration() {
        let mut pools = PoolManager::new(PoolConfig::default());
        pools.register_category_prototype(PoolCategory::Audio, "hit", prototype(Voice::default));

        let voice = pools.play_audio("hit", Vec3::X, 0.5).unwrap();
        assert!(pools.get(voice).unwrap().playing);
        assert!(pools.contains_pool("audio/hit"));

        pools.update(0.5);
        assert!(!pools.get(voice).unwrap().playing);
        assert!(!pools.is_active(voice));
    }

    /// A non-positive lifetime leaves the instance to the caller.
    #[test]
    fn test_zero_lifetime_is_not_released() {
        let mut pools = PoolManager::new(PoolConfig::default());
        pools.register_category_prototype(PoolCategory::Effect, "Spark", prototype(Voice::default));

        let spark = pools.spawn_effect("Spark", Vec3::ZERO, 0.0).unwrap();
        assert_eq!(pools.pending_releases(), 0);
        pools.update(100.0);
        assert!(pools.is_active(spark));
    }

    #[test]
    fn test_notification_uses_parent() {
        let mut pools = PoolManager::new(PoolConfig::default());
        pools.register_category_prototype(
            PoolCategory::Notification,
            "levelup",
            prototype(Voice::default),
        );

        let popup = pools
            .show_notification("levelup", Some(ParentId(3)), 2.0)
            .unwrap();
        assert_eq!(pools.instance(popup).unwrap().parent(), ParentId(3));
        assert_eq!(pools.pending_releases(), 1);
    }

    #[test]
    fn test_unregistered_category_spawn_fails() {
        let mut pools: PoolManager<Voice> = PoolManager::new(PoolConfig::default());
        assert!(pools.spawn_effect("Missing", Vec3::ZERO, 1.0).is_none());
    }
}
