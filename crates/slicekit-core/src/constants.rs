//! Engine vocabulary: file extensions, well-known file names and CLI flags.

/// Extension of the engine's native toolpath output.
pub const TOOLPATH_EXTENSION: &str = "gcode";

/// Extension of the packaged project container.
pub const CONTAINER_EXTENSION: &str = "3mf";

/// Output name requested from the engine when exporting a container.
pub const CONTAINER_OUTPUT_NAME: &str = "result.3mf";

/// Name of the archive produced when a job yields several artifacts.
pub const ARCHIVE_FILE_NAME: &str = "result.zip";

/// Diagnostic report the engine may leave in its output directory on failure.
pub const DIAGNOSTIC_REPORT_FILE: &str = "result.json";

/// Slice-target value selecting every plate.
pub const ALL_PLATES_SENTINEL: &str = "0";

/// Slice-target value used when no plate is selected.
pub const DEFAULT_PLATE: &str = "1";

/// Joins the printer and preset profile paths in the settings flag.
pub const SETTINGS_PATH_SEPARATOR: char = ';';

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "slice-";

/// Command-line flags understood by the slicing engine.
pub mod flags {
    pub const EXPORT_3MF: &str = "--export-3mf";
    pub const SLICE: &str = "--slice";
    pub const ARRANGE: &str = "--arrange";
    pub const ORIENT: &str = "--orient";
    pub const LOAD_SETTINGS: &str = "--load-settings";
    pub const LOAD_FILAMENTS: &str = "--load-filaments";
    pub const CURR_BED_TYPE: &str = "--curr-bed-type";
    pub const ALLOW_MULTICOLOR_ONEPLATE: &str = "--allow-multicolor-oneplate";
    pub const ALLOW_NEWER_FILE: &str = "--allow-newer-file";
    pub const OUTPUT_DIR: &str = "--outputdir";
    pub const HELP: &str = "--help";
}

/// Response headers carrying slice metadata.
pub mod headers {
    pub const PRINT_TIME_SECONDS: &str = "X-Print-Time-Seconds";
    pub const FILAMENT_USED_G: &str = "X-Filament-Used-g";
    pub const FILAMENT_USED_MM: &str = "X-Filament-Used-mm";
}
