//! Device lifecycle ordering at the backend seam, and host registration
//! including the abandoned-registration path.

use mixout::backend::mock::{Call, MockBackend, MockDevice};
use mixout::config::Overrides;
use mixout::error::OutputError;
use mixout::format::SampleEncoding;
use mixout::host::{HostSystem, Mixer, MixerError, OpenRequest, OutputDescription};
use mixout::output::register_with;
use mixout::{OutputDriver, PLUGIN_NAME, PLUGIN_VERSION};

struct NullMixer;

impl Mixer for NullMixer {
    fn read(&mut self, _dest: &mut [u8], _frames: usize) -> Result<(), MixerError> {
        Ok(())
    }
}

#[derive(Default)]
struct TestHost {
    registered: Vec<(&'static str, u32)>,
    driver: Option<OutputDriver>,
    selected: Option<u32>,
}

impl HostSystem for TestHost {
    fn register_output(&mut self, description: OutputDescription) -> u32 {
        self.registered.push((description.name, description.version));
        self.driver = Some(description.driver);
        7
    }

    fn set_output(&mut self, handle: u32) {
        self.selected = Some(handle);
    }
}

fn open_request() -> OpenRequest {
    OpenRequest {
        rate: 48_000,
        channels: 2,
        encoding: SampleEncoding::Float32,
        frames_per_callback: 512,
        buffer_count: 2,
    }
}

#[test]
fn device_lifecycle_reaches_the_backend_in_order() {
    let backend = MockBackend::new(vec![MockDevice::new("Speakers", 48_000, 2)]);
    let handle = backend.handle();
    let mut driver = OutputDriver::new(Box::new(backend));
    let (mut device, _) = driver
        .init_with(0, open_request(), None, Box::new(NullMixer), Overrides::default())
        .expect("open must succeed");
    device.start().expect("start must succeed");
    device.stop().expect("stop must succeed");
    device.close();

    // Close pauses the stream before releasing it.
    assert_eq!(
        handle.calls(),
        vec![
            Call::Open,
            Call::Attach,
            Call::Play,
            Call::Pause,
            Call::Pause,
            Call::Close,
        ]
    );
}

#[test]
fn close_releases_exactly_once() {
    let backend = MockBackend::new(vec![MockDevice::new("Speakers", 48_000, 2)]);
    let handle = backend.handle();
    let mut driver = OutputDriver::new(Box::new(backend));
    let (device, _) = driver
        .init_with(0, open_request(), None, Box::new(NullMixer), Overrides::default())
        .expect("open must succeed");
    device.close();

    let calls = handle.calls();
    assert_eq!(calls.last(), Some(&Call::Close));
    assert_eq!(
        calls.iter().filter(|c| **c == Call::Close).count(),
        1,
        "the stream must be released exactly once"
    );
}

#[test]
fn registration_wires_the_host() {
    let backend = MockBackend::new(vec![MockDevice::new("Speakers", 48_000, 2)]);
    let mut host = TestHost::default();
    let handle = register_with(&mut host, Ok(Box::new(backend)))
        .expect("registration must succeed with a live subsystem");
    assert_eq!(handle, 7);
    assert_eq!(host.selected, Some(7), "the driver must be selected as active output");
    assert_eq!(host.registered, vec![(PLUGIN_NAME, PLUGIN_VERSION)]);

    let driver = host.driver.expect("the host owns the driver after registration");
    assert_eq!(driver.num_drivers(), 2);
}

#[test]
fn failed_subsystem_aborts_registration() {
    let mut host = TestHost::default();
    let err = register_with(&mut host, Err("no audio subsystem".to_string()))
        .expect_err("a dead subsystem must abort registration");
    assert!(matches!(err, OutputError::SubsystemInit(_)), "{err:?}");
    assert!(host.registered.is_empty(), "nothing may be registered");
    assert_eq!(host.selected, None);
}
