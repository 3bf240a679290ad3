//! Per-pixel amplitude summary
//!
//! Downsamples the first channel of a decoded buffer into one `(min, max)`
//! pair per pixel column.

use woodshed_core::SampleBuffer;

/// One `(min, max)` pair per pixel column
pub type WaveformBitmap = Vec<(f32, f32)>;

/// Summarize `buffer` into `pixel_width` columns
///
/// Column `c` covers samples `[c × len / width, (c + 1) × len / width)`, so
/// every sample lands in exactly one column even when `len` is not a
/// multiple of the width. Columns with no samples (width > len) are `(0, 0)`.
/// Single pass over the data.
pub fn generate_bitmap(buffer: &SampleBuffer, pixel_width: usize) -> WaveformBitmap {
    let Some(samples) = buffer.channel(0) else {
        return Vec::new();
    };
    let len = samples.len();
    if pixel_width == 0 {
        return Vec::new();
    }

    (0..pixel_width)
        .map(|col| {
            let start = col * len / pixel_width;
            let end = (col + 1) * len / pixel_width;
            column_peaks(&samples[start..end])
        })
        .collect()
}

fn column_peaks(column: &[f32]) -> (f32, f32) {
    let Some((&first, rest)) = column.split_first() else {
        return (0.0, 0.0);
    };
    rest.iter()
        .fold((first, first), |(min, max), &s| (min.min(s), max.max(s)))
}
