use std::io::Read;

use flate2::read::MultiGzDecoder;

/// Check whether a resource file name denotes single-stream gzip content.
///
/// Block-compressed `.bgz` files are excluded: those are opened in raw
/// seekable mode by the indexed table layer.
pub fn is_gzip_filename(filename: &str) -> bool {
    filename.ends_with(".gz") && !filename.ends_with(".bgz")
}

///
/// Wrap a raw reader in a gzip decoder when the file name calls for it.
///
pub fn maybe_decompress(filename: &str, reader: Box<dyn Read>) -> Box<dyn Read> {
    if is_gzip_filename(filename) {
        Box::new(MultiGzDecoder::new(reader))
    } else {
        reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    #[test]
    fn test_is_gzip_filename() {
        assert!(is_gzip_filename("scores.txt.gz"));
        assert!(!is_gzip_filename("scores.txt"));
        assert!(!is_gzip_filename("scores.txt.bgz"));
    }

    #[test]
    fn test_maybe_decompress_roundtrip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"chrom\tpos\n1\t10\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut reader =
            maybe_decompress("table.txt.gz", Box::new(std::io::Cursor::new(compressed)));
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "chrom\tpos\n1\t10\n");
    }
}
