//! Offline host for the Basic Audio Unit.
//!
//! Instantiates the unit, allocates render resources, then drives the render
//! block quantum by quantum the way an audio engine would: each call gets a
//! timestamp, the host's linked event list for that quantum and an
//! `AudioBufferList`. The rendered audio is written to a 32-bit float
//! stereo WAV file.

use std::path::PathBuf;

use basic_au::{
    format_value, os_status, AUMIDIEvent, AURenderEvent, AURenderEventType, AudioTimeStamp,
    BasicAudioUnit, RenderBlock, StereoBufferList, Variant,
};
use basic_au_core::{EngineConfig, RenderFormat};

/// Notes of the demo phrase: C major arpeggio up and back.
const PHRASE: [u8; 6] = [60, 64, 67, 72, 67, 64];
const VELOCITY: u8 = 100;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let options = match Options::parse(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&options) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage: basic-au-host [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --variant <name>   osc, sampler, file or file+reverb (default: osc)");
    eprintln!("  --file <path>      WAV file for the file variants");
    eprintln!("  --frames <n>       Total frames to render (default: 176400)");
    eprintln!("  --block <n>        Frames per render call (default: 512)");
    eprintln!("  --preset <index>   Apply a factory preset before rendering");
    eprintln!("  --config <path>    Engine configuration (JSON)");
    eprintln!("  --out <path>       Output WAV (default: basic-au.wav)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  basic-au-host --variant sampler --out sampler.wav");
    eprintln!("  basic-au-host --variant file+reverb --file loop.wav --block 256");
}

#[derive(Debug, Clone, PartialEq)]
struct Options {
    variant: Variant,
    frames: u64,
    block: u32,
    preset: Option<usize>,
    config: Option<PathBuf>,
    out: PathBuf,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut variant_name = "osc".to_string();
        let mut file = None;
        let mut frames = 176_400;
        let mut block = 512;
        let mut preset = None;
        let mut config = None;
        let mut out = PathBuf::from("basic-au.wav");

        let mut iter = args.iter();
        while let Some(flag) = iter.next() {
            let mut value = || {
                iter.next().ok_or_else(|| format!("{} requires a value", flag))
            };
            match flag.as_str() {
                "--variant" => variant_name = value()?.clone(),
                "--file" => file = Some(PathBuf::from(value()?)),
                "--frames" => frames = parse_number(flag, value()?)?,
                "--block" => block = parse_number(flag, value()?)?,
                "--preset" => preset = Some(parse_number(flag, value()?)?),
                "--config" => config = Some(PathBuf::from(value()?)),
                "--out" => out = PathBuf::from(value()?),
                other => return Err(format!("unknown option '{}'", other)),
            }
        }

        let variant = Variant::parse(&variant_name, file).ok_or_else(|| {
            format!(
                "unknown variant '{}' (file variants need --file)",
                variant_name
            )
        })?;
        if block == 0 {
            return Err("--block must be at least 1".to_string());
        }

        Ok(Self {
            variant,
            frames,
            block,
            preset,
            config,
            out,
        })
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{} expects a number, got '{}'", flag, value))
}

fn run(options: &Options) -> Result<(), String> {
    let engine_config = match &options.config {
        Some(path) => EngineConfig::load(path).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    let format = engine_config.format();
    if options.block > format.max_frames {
        return Err(format!(
            "--block {} exceeds the maximum frame count {}",
            options.block, format.max_frames
        ));
    }

    let mut unit = BasicAudioUnit::with_config(options.variant.clone(), engine_config)
        .map_err(|e| e.to_string())?;
    if let Some(index) = options.preset {
        unit.set_current_preset(index).map_err(|e| e.to_string())?;
    }
    for parameter in unit.parameter_tree() {
        let info = unit
            .registry()
            .info(parameter.address)
            .map_err(|e| e.to_string())?;
        log::info!(
            "Parameter {} '{}' = {}",
            parameter.address,
            parameter.name,
            format_value(info, parameter.value)
        );
    }

    unit.allocate_render_resources(format).map_err(|e| e.to_string())?;
    let schedule = phrase_schedule(format.sample_rate, options.frames);
    let written = render_to_wav(&unit.render_block(), &format, options, &schedule)?;

    let stats = unit.stats().map_err(|e| e.to_string())?;
    log::info!(
        "Wrote {} frames to {} ({} render calls, {} ignored events, {} dropped events)",
        written,
        options.out.display(),
        stats.render_calls,
        stats.ignored_events,
        stats.dropped_events
    );
    unit.deallocate_render_resources().map_err(|e| e.to_string())
}

/// One scheduled MIDI message at an absolute sample time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scheduled {
    sample_time: i64,
    data: [u8; 3],
}

/// Note-on every half second, each held for a quarter second.
fn phrase_schedule(sample_rate: f64, total_frames: u64) -> Vec<Scheduled> {
    let step = (sample_rate * 0.5) as i64;
    let hold = step / 2;
    PHRASE
        .iter()
        .cycle()
        .enumerate()
        .map(|(index, &note)| (index as i64 * step, note))
        .take_while(|&(start, _)| start < total_frames as i64)
        .flat_map(|(start, note)| {
            [
                Scheduled {
                    sample_time: start,
                    data: [0x90, note, VELOCITY],
                },
                Scheduled {
                    sample_time: start + hold,
                    data: [0x80, note, 0],
                },
            ]
        })
        .collect()
}

/// Build the host's linked event list for `[start, end)`.
///
/// The returned vector owns the events; its first element is the list head.
fn events_for_quantum(schedule: &[Scheduled], start: i64, end: i64) -> Vec<AURenderEvent> {
    let in_range: Vec<&Scheduled> = schedule
        .iter()
        .filter(|event| (start..end).contains(&event.sample_time))
        .collect();

    let mut events: Vec<AURenderEvent> = Vec::with_capacity(in_range.len());
    let base = events.as_ptr();
    for (index, event) in in_range.iter().enumerate() {
        let next = if index + 1 < in_range.len() {
            base.wrapping_add(index + 1)
        } else {
            std::ptr::null()
        };
        events.push(AURenderEvent {
            midi: AUMIDIEvent {
                next,
                event_sample_time: event.sample_time,
                event_type: AURenderEventType::Midi as u8,
                reserved: 0,
                length: 3,
                cable: 0,
                data: event.data,
            },
        });
    }
    events
}

fn render_to_wav(
    block: &RenderBlock,
    format: &RenderFormat,
    options: &Options,
    schedule: &[Scheduled],
) -> Result<u64, String> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: format.sample_rate.round() as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&options.out, spec)
        .map_err(|e| format!("cannot create {}: {}", options.out.display(), e))?;

    let mut left = vec![0.0f32; options.block as usize];
    let mut right = vec![0.0f32; options.block as usize];
    let mut position: u64 = 0;

    while position < options.frames {
        let frames = (options.frames - position).min(options.block as u64) as u32;
        let start = position as i64;
        let events = events_for_quantum(schedule, start, start + frames as i64);
        let head = events
            .first()
            .map_or(std::ptr::null(), |event| event as *const AURenderEvent);
        let timestamp = AudioTimeStamp::from_sample_time(position as f64);

        let mut list = StereoBufferList::new(
            &mut left[..frames as usize],
            &mut right[..frames as usize],
        );
        // SAFETY: the timestamp, buffer list and event list outlive the call
        // and the event list is null-terminated.
        let status = unsafe { block.render_raw(&timestamp, frames, list.as_mut_ptr(), head) };
        if status != os_status::NO_ERR {
            return Err(format!(
                "render failed at frame {} with status {}",
                position, status
            ));
        }

        for (l, r) in left[..frames as usize].iter().zip(&right[..frames as usize]) {
            writer.write_sample(*l).map_err(|e| e.to_string())?;
            writer.write_sample(*r).map_err(|e| e.to_string())?;
        }
        position += frames as u64;
    }

    writer.finalize().map_err(|e| e.to_string())?;
    Ok(position)
}
