//! Command-line construction for the slicing engine

use slicekit_core::constants::{flags, CONTAINER_OUTPUT_NAME, SETTINGS_PATH_SEPARATOR};
use slicekit_core::{ExportFormat, SliceSettings};
use slicekit_profiles::ResolvedProfiles;
use std::ffi::OsString;
use std::path::Path;

/// Translate settings into the engine's argument list
///
/// Optional settings that are unset produce no flag at all, so the engine
/// falls back to its own defaults. The model path is always last.
pub fn build_args(
    profiles: &ResolvedProfiles,
    settings: &SliceSettings,
    input: &Path,
    output_dir: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(20);

    if settings.export_format == ExportFormat::ThreeMf {
        args.push(flags::EXPORT_3MF.into());
        args.push(CONTAINER_OUTPUT_NAME.into());
    }

    args.push(flags::SLICE.into());
    args.push(settings.plate.slice_arg().into());

    if let Some(arrange) = settings.arrange {
        args.push(flags::ARRANGE.into());
        args.push(bool_arg(arrange).into());
    }

    if let Some(orient) = settings.orient {
        args.push(flags::ORIENT.into());
        args.push(bool_arg(orient).into());
    }

    if let (Some(printer), Some(preset)) = (&profiles.printer, &profiles.preset) {
        let mut combined = OsString::from(printer.as_os_str());
        combined.push(SETTINGS_PATH_SEPARATOR.to_string());
        combined.push(preset.as_os_str());
        args.push(flags::LOAD_SETTINGS.into());
        args.push(combined);
    }

    if let Some(filament) = &profiles.filament {
        args.push(flags::LOAD_FILAMENTS.into());
        args.push(filament.as_os_str().to_owned());
    }

    if let Some(bed_type) = &settings.bed_type {
        args.push(flags::CURR_BED_TYPE.into());
        args.push(bed_type.into());
    }

    if settings.multicolor_one_plate {
        args.push(flags::ALLOW_MULTICOLOR_ONEPLATE.into());
    }

    args.push(flags::ALLOW_NEWER_FILE.into());

    args.push(flags::OUTPUT_DIR.into());
    args.push(output_dir.as_os_str().to_owned());

    args.push(input.as_os_str().to_owned());
    args
}

fn bool_arg(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}
