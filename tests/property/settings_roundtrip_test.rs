//! Property-based tests: settings survive a save/load round trip for any
//! representable configuration.

use deskbrowser::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use deskbrowser::types::settings::{
    BrowserSettings, EngineSettings, GeneralSettings, ThemeSettings,
};
use proptest::prelude::*;

fn arb_settings() -> impl Strategy<Value = BrowserSettings> {
    (
        // general
        ("[a-z0-9.:/-]{0,30}", "[a-z0-9.:/-]{1,30}", any::<bool>()),
        // engine timing
        (1u64..1000, 1u64..1000, 1u32..100),
        // theme limits
        (0u32..64, 0u32..64, 1u64..5000),
    )
        .prop_map(|(general, engine, theme)| BrowserSettings {
            general: GeneralSettings {
                homepage: general.0,
                default_url: general.1,
                restore_last_session: general.2,
            },
            engine: EngineSettings {
                creation_poll_interval_ms: engine.0,
                pump_interval_ms: engine.1,
                zoom_poll_ticks: engine.2,
            },
            theme: ThemeSettings {
                retry_limit: theme.0,
                ready_retry_limit: theme.1,
                retry_delay_ms: theme.2,
            },
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn settings_roundtrip_through_disk(settings in arb_settings()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();

        // Write via serde the same way the engine saves.
        std::fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();

        let mut engine = SettingsEngine::new(Some(path));
        let loaded = engine.load().unwrap();
        prop_assert_eq!(loaded, settings);
    }

    #[test]
    fn settings_roundtrip_through_json_value(settings in arb_settings()) {
        let value = serde_json::to_value(&settings).unwrap();
        let back: BrowserSettings = serde_json::from_value(value).unwrap();
        prop_assert_eq!(back, settings);
    }
}
