//! Device enumeration against the mock backend: endpoint counting, the
//! default slot's resolution ladder, and the layout table's hard edges.

use mixout::OutputDriver;
use mixout::backend::NativeFormat;
use mixout::backend::mock::{MockBackend, MockDevice};
use mixout::config::Overrides;
use mixout::error::OutputError;
use mixout::format::SpeakerLayout;
use mixout::output::DEFAULT_DRIVER_NAME;

fn no_overrides() -> Overrides {
    Overrides::default()
}

fn two_device_backend() -> MockBackend {
    MockBackend::new(vec![
        MockDevice::new("Speakers", 48_000, 2),
        MockDevice::new("HDMI Receiver", 44_100, 6),
    ])
}

#[test]
fn count_reserves_the_default_slot() {
    let driver = OutputDriver::new(Box::new(two_device_backend()));
    assert_eq!(driver.num_drivers(), 3);
}

#[test]
fn no_devices_means_no_default_slot() {
    let driver = OutputDriver::new(Box::new(MockBackend::new(Vec::new())));
    assert_eq!(driver.num_drivers(), 0);
}

#[test]
fn default_slot_adopts_the_richest_layout() {
    // No default probe: the scan adopts the 6-channel device and its rate.
    let driver = OutputDriver::new(Box::new(two_device_backend()));
    let info = driver
        .driver_info_with(0, no_overrides())
        .expect("default slot must resolve");
    assert_eq!(info.name, DEFAULT_DRIVER_NAME);
    assert_eq!(info.guid, [0; 16], "default slot has no hardware identity");
    assert_eq!(info.system_rate, 44_100);
    assert_eq!(info.channels, 6);
    assert_eq!(info.layout, SpeakerLayout::FivePointOne);
}

#[test]
fn real_devices_report_their_native_format() {
    let driver = OutputDriver::new(Box::new(two_device_backend()));
    let info = driver
        .driver_info_with(1, no_overrides())
        .expect("device 0 must resolve");
    assert_eq!(info.name, "Speakers");
    assert_eq!(info.system_rate, 48_000);
    assert_eq!(info.channels, 2);
    assert_eq!(info.layout, SpeakerLayout::Stereo);
}

#[test]
fn probed_default_wins_over_the_scan() {
    let backend = two_device_backend().probe_default(NativeFormat {
        rate: 48_000,
        channels: 2,
    });
    let driver = OutputDriver::new(Box::new(backend));
    let info = driver
        .driver_info_with(0, no_overrides())
        .expect("default slot must resolve");
    assert_eq!(info.system_rate, 48_000);
    assert_eq!(info.channels, 2);
    assert_eq!(info.layout, SpeakerLayout::Stereo);
}

#[test]
fn channel_override_beats_autodetection() {
    let overrides = Overrides {
        rate: None,
        channels: Some(2),
    };
    let driver = OutputDriver::new(Box::new(two_device_backend()));
    let info = driver
        .driver_info_with(0, overrides)
        .expect("default slot must resolve");
    assert_eq!(info.channels, 2, "override wins over the 6-channel scan");
    assert_eq!(info.layout, SpeakerLayout::Stereo);
    assert_eq!(info.system_rate, 44_100, "rate stays autodetected");
}

#[test]
fn rate_override_pins_rate_only() {
    let overrides = Overrides {
        rate: Some(96_000),
        channels: None,
    };
    let driver = OutputDriver::new(Box::new(two_device_backend()));
    let info = driver
        .driver_info_with(0, overrides)
        .expect("default slot must resolve");
    assert_eq!(info.system_rate, 96_000);
    assert_eq!(info.channels, 6, "channels stay autodetected");
}

#[test]
fn unmapped_channel_count_fails_that_device_only() {
    let driver = OutputDriver::new(Box::new(MockBackend::new(vec![
        MockDevice::new("Weird Array", 48_000, 3),
        MockDevice::new("Speakers", 48_000, 2),
    ])));
    match driver.driver_info_with(1, no_overrides()) {
        Err(OutputError::UnsupportedLayout(3)) => {}
        other => panic!("expected UnsupportedLayout(3), got {other:?}"),
    }
    let info = driver
        .driver_info_with(2, no_overrides())
        .expect("the stereo device is unaffected");
    assert_eq!(info.layout, SpeakerLayout::Stereo);
}

#[test]
fn unknown_native_format_falls_back_to_defaults() {
    let driver = OutputDriver::new(Box::new(MockBackend::new(vec![MockDevice::opaque(
        "Mystery Box",
    )])));
    let info = driver
        .driver_info_with(1, no_overrides())
        .expect("device without a probe still resolves");
    assert_eq!(info.system_rate, 48_000);
    assert_eq!(info.channels, 2);
    assert_eq!(info.layout, SpeakerLayout::Stereo);
}
