//! End-to-end render scenarios through the unit's render handle.

use std::path::PathBuf;
use std::ptr;

use approx::assert_relative_eq;
use basic_au::{
    os_status, AUMIDIEvent, AURenderEvent, AURenderEventType, AudioTimeStamp, BasicAudioUnit,
    StereoBufferList, Variant, GAIN,
};
use basic_au_core::{AudioBuffer, RenderEvent, RenderFormat};

const FRAMES: u32 = 512;

fn format() -> RenderFormat {
    RenderFormat::new(44100.0, 2, 4096)
}

fn allocated(variant: Variant) -> BasicAudioUnit {
    let unit = BasicAudioUnit::new(variant).unwrap();
    unit.allocate_render_resources(format()).unwrap();
    unit
}

fn render(unit: &BasicAudioUnit, events: &[RenderEvent]) -> AudioBuffer {
    let mut output = AudioBuffer::stereo(FRAMES as usize);
    let status = unit.render_block().render(FRAMES, events, &mut output);
    assert_eq!(status, os_status::NO_ERR);
    output
}

/// Write a constant-valued mono WAV and return its path.
fn dc_wav(name: &str, value: f32) -> PathBuf {
    let path = std::env::temp_dir().join(format!("basic-au-{}-{}.wav", name, std::process::id()));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..1024 {
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
    path
}

#[test]
fn test_gain_is_clamped_and_applied() {
    let path = dc_wav("clamp", 0.5);
    let unit = allocated(Variant::FilePlayer {
        path: path.clone(),
        reverb: false,
    });

    assert_eq!(unit.set_parameter(GAIN, 2.0).unwrap(), 1.0);
    assert_eq!(unit.parameter(GAIN).unwrap(), 1.0);

    let output = render(&unit, &[]);
    assert!(output.channel(0).iter().all(|&s| s == 0.5));
    assert!(output.channel(1).iter().all(|&s| s == 0.5));

    drop(unit);
    std::fs::remove_file(path).ok();
}

#[test]
fn test_gain_scales_instrument_output() {
    let note = [RenderEvent::note_on(0, 60, 100, 0)];

    let full = allocated(Variant::Oscillator);
    full.set_parameter(GAIN, 2.0).unwrap();
    let loud = render(&full, &note);

    let half = allocated(Variant::Oscillator);
    half.set_parameter(GAIN, 0.5).unwrap();
    let quiet = render(&half, &note);

    assert!(loud.peak(0..FRAMES as usize) > 0.0);
    for (a, b) in loud.channel(0).iter().zip(quiet.channel(0)) {
        assert_relative_eq!(a * 0.5, *b, epsilon = 1e-6);
    }
}

#[test]
fn test_note_off_mid_buffer() {
    let unit = allocated(Variant::Oscillator);
    let events = [
        RenderEvent::note_on(0, 60, 100, 0),
        RenderEvent::note_off(256, 60, 0),
    ];

    let output = render(&unit, &events);
    assert!(output.peak(0..256) > 0.0);
    assert_eq!(output.peak(256..512), 0.0);
    assert!(!unit.is_note_active(60, 0));
}

#[test]
fn test_repeated_renders_reuse_resources() {
    let unit = allocated(Variant::Sampler);

    render(&unit, &[RenderEvent::note_on(0, 64, 90, 0)]);
    let second = render(&unit, &[]);
    assert!(second.peak(0..FRAMES as usize) > 0.0);

    let stats = unit.stats().unwrap();
    assert_eq!(stats.render_calls, 2);
    assert_eq!(stats.frames_rendered, 2 * FRAMES as u64);
    assert_eq!(stats.failed_calls, 0);
}

#[test]
fn test_last_parameter_event_wins() {
    let unit = allocated(Variant::Oscillator);
    let events = [
        RenderEvent::parameter_set(0, GAIN, 0.9),
        RenderEvent::parameter_set(100, GAIN, 0.3),
        RenderEvent::parameter_ramp(100, GAIN, 0.7, 64),
    ];

    render(&unit, &events);
    assert_relative_eq!(unit.parameter(GAIN).unwrap(), 0.7);
    assert_relative_eq!(unit.mix_level(), 0.7);
}

#[test]
fn test_too_many_frames_leaves_buffer_untouched() {
    let unit = allocated(Variant::Oscillator);
    let mut output = AudioBuffer::stereo(8192);
    output.fill(9.0);

    let status = unit
        .render_block()
        .render(8192, &[RenderEvent::note_on(0, 60, 100, 0)], &mut output);
    assert_eq!(status, os_status::TOO_MANY_FRAMES_TO_PROCESS);
    assert!(output.channel(0).iter().all(|&s| s == 9.0));
    assert!(!unit.is_note_active(60, 0));

    // The engine stays usable.
    render(&unit, &[]);
}

#[test]
fn test_unknown_parameter_event_still_renders() {
    let unit = allocated(Variant::Oscillator);
    let events = [
        RenderEvent::note_on(0, 60, 100, 0),
        RenderEvent::parameter_set(10, 42, 1.0),
    ];

    let mut output = AudioBuffer::stereo(FRAMES as usize);
    let status = unit.render_block().render(FRAMES, &events, &mut output);
    assert_eq!(status, os_status::INVALID_PARAMETER);
    assert!(output.peak(0..FRAMES as usize) > 0.0);
}

#[test]
fn test_deallocate_twice() {
    let unit = allocated(Variant::Oscillator);
    unit.deallocate_render_resources().unwrap();
    unit.deallocate_render_resources().unwrap();

    let mut output = AudioBuffer::stereo(FRAMES as usize);
    assert_eq!(
        unit.render_block().render(FRAMES, &[], &mut output),
        os_status::UNINITIALIZED
    );

    unit.allocate_render_resources(format()).unwrap();
    render(&unit, &[]);
}

#[test]
fn test_note_on_and_off_in_one_call() {
    let unit = allocated(Variant::Oscillator);
    let events = [
        RenderEvent::note_on(0, 72, 100, 1),
        RenderEvent::note_off(0, 72, 1),
    ];

    let output = render(&unit, &events);
    assert!(!unit.is_note_active(72, 1));
    assert_eq!(output.peak(0..FRAMES as usize), 0.0);
}

#[test]
fn test_mono_format_is_rejected() {
    let unit = BasicAudioUnit::new(Variant::Oscillator).unwrap();
    assert!(unit
        .allocate_render_resources(RenderFormat::new(44100.0, 1, 4096))
        .is_err());
    assert!(!unit.is_allocated());
}

fn midi(sample_time: i64, data: [u8; 3], next: *const AURenderEvent) -> AURenderEvent {
    AURenderEvent {
        midi: AUMIDIEvent {
            next,
            event_sample_time: sample_time,
            event_type: AURenderEventType::Midi as u8,
            reserved: 0,
            length: 3,
            cable: 0,
            data,
        },
    }
}

#[test]
fn test_host_event_list_through_raw_render() {
    let unit = allocated(Variant::Oscillator);
    let block = unit.render_block();

    // Second quantum of a stream: absolute times start at 512.
    let note_off = midi(768, [0x80, 60, 0], ptr::null());
    let note_on = midi(512, [0x90, 60, 100], &note_off);
    let timestamp = AudioTimeStamp::from_sample_time(512.0);

    let mut left = vec![0.0f32; FRAMES as usize];
    let mut right = vec![0.0f32; FRAMES as usize];
    let mut list = StereoBufferList::new(&mut left, &mut right);
    let status = unsafe { block.render_raw(&timestamp, FRAMES, list.as_mut_ptr(), &note_on) };
    assert_eq!(status, os_status::NO_ERR);

    assert!(left[..256].iter().any(|&s| s != 0.0));
    assert!(left[256..].iter().all(|&s| s == 0.0));
    assert_eq!(left, right);
}

#[test]
fn test_short_host_buffer_refuses_call() {
    let unit = allocated(Variant::Oscillator);
    let block = unit.render_block();

    let note_on = midi(0, [0x90, 60, 100], ptr::null());
    let mut left = vec![7.0f32; FRAMES as usize];
    let mut right = vec![7.0f32; 128];
    let mut list = StereoBufferList::new(&mut left, &mut right);
    let status =
        unsafe { block.render_raw(ptr::null(), FRAMES, list.as_mut_ptr(), &note_on) };

    assert_eq!(status, os_status::TOO_MANY_FRAMES_TO_PROCESS);
    assert!(left.iter().all(|&s| s == 7.0));
    assert!(right.iter().all(|&s| s == 7.0));
    assert!(!unit.is_note_active(60, 0));

    let stats = unit.stats().unwrap();
    assert_eq!(stats.render_calls, 1);
    assert_eq!(stats.failed_calls, 1);
    assert_eq!(stats.frames_rendered, 0);
}

#[test]
fn test_file_player_with_reverb() {
    let path = dc_wav("reverb", 0.25);
    let unit = allocated(Variant::FilePlayer {
        path: path.clone(),
        reverb: true,
    });

    let output = render(&unit, &[]);
    assert!(output.channel(0).iter().all(|s| s.is_finite()));
    assert!(output.peak(0..FRAMES as usize) > 0.0);

    drop(unit);
    std::fs::remove_file(path).ok();
}
