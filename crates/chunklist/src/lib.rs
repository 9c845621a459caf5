// Chunklist parsing: resolves a variant playlist to its single media playlist
// URI and lists the segment URIs of a media playlist, in broadcast order.
//
// Pure transforms over already-fetched bytes; fetching is the caller's job.

use m3u8_rs::parse_playlist_res;

#[derive(Debug, thiserror::Error)]
pub enum ChunklistError {
    #[error("failed to parse playlist: {reason}")]
    Parse { reason: String },

    #[error("expected a variant playlist, got a media playlist")]
    NotVariant,

    #[error("expected a media playlist, got a variant playlist")]
    NotMedia,

    #[error("invalid playlist format: expected exactly one variant, got {count}")]
    VariantCount { count: usize },

    #[error("invalid playlist format: variant entry has an empty URI")]
    EmptyVariantUri,
}

/// Return the media playlist URI contained in a variant playlist.
///
/// Time-shift endpoints serve a master playlist with exactly one variant;
/// any other count means the broadcaster returned something unexpected and
/// the bytes are rejected rather than guessed at.
pub fn resolve_variant(bytes: &[u8]) -> Result<String, ChunklistError> {
    match parse_playlist_res(bytes) {
        Ok(m3u8_rs::Playlist::MasterPlaylist(master)) => {
            if master.variants.len() != 1 {
                return Err(ChunklistError::VariantCount {
                    count: master.variants.len(),
                });
            }
            let uri = master.variants[0].uri.clone();
            if uri.is_empty() {
                return Err(ChunklistError::EmptyVariantUri);
            }
            Ok(uri)
        }
        Ok(m3u8_rs::Playlist::MediaPlaylist(_)) => Err(ChunklistError::NotVariant),
        Err(e) => Err(ChunklistError::Parse {
            reason: e.to_string(),
        }),
    }
}

/// Return the segment URIs of a media playlist, preserving playlist order.
///
/// Entries with an empty URI are skipped instead of failing the whole parse.
/// An empty result is valid; the caller decides whether that is fatal.
pub fn list_segments(bytes: &[u8]) -> Result<Vec<String>, ChunklistError> {
    match parse_playlist_res(bytes) {
        Ok(m3u8_rs::Playlist::MediaPlaylist(media)) => Ok(media
            .segments
            .into_iter()
            .filter(|segment| !segment.uri.is_empty())
            .map(|segment| segment.uri)
            .collect()),
        Ok(m3u8_rs::Playlist::MasterPlaylist(_)) => Err(ChunklistError::NotMedia),
        Err(e) => Err(ChunklistError::Parse {
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_VARIANT: &str = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=48000,CODECS=\"mp4a.40.5\"\n\
https://radio.example.com/program/chunklist.m3u8\n";

    const TWO_VARIANTS: &str = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=48000\n\
https://radio.example.com/program/lo/chunklist.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=128000\n\
https://radio.example.com/program/hi/chunklist.m3u8\n";

    const MEDIA: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-TARGETDURATION:5\n\
#EXT-X-MEDIA-SEQUENCE:1\n\
#EXTINF:5.0,\n\
https://radio.example.com/program/seg_0.aac\n\
#EXTINF:5.0,\n\
https://radio.example.com/program/seg_1.aac\n\
#EXTINF:4.8,\n\
https://radio.example.com/program/seg_2.aac\n\
#EXT-X-ENDLIST\n";

    const EMPTY_MEDIA: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-TARGETDURATION:5\n\
#EXT-X-MEDIA-SEQUENCE:1\n\
#EXT-X-ENDLIST\n";

    #[test]
    fn resolves_single_variant() {
        let uri = resolve_variant(SINGLE_VARIANT.as_bytes()).unwrap();
        assert_eq!(uri, "https://radio.example.com/program/chunklist.m3u8");
    }

    #[test]
    fn rejects_multiple_variants() {
        let err = resolve_variant(TWO_VARIANTS.as_bytes()).unwrap_err();
        assert!(matches!(err, ChunklistError::VariantCount { count: 2 }));
    }

    #[test]
    fn rejects_media_playlist_as_variant() {
        let err = resolve_variant(MEDIA.as_bytes()).unwrap_err();
        assert!(matches!(err, ChunklistError::NotVariant));
    }

    #[test]
    fn rejects_garbage_as_variant() {
        assert!(resolve_variant(b"not a playlist at all").is_err());
    }

    #[test]
    fn lists_segments_in_playlist_order() {
        let segments = list_segments(MEDIA.as_bytes()).unwrap();
        assert_eq!(
            segments,
            vec![
                "https://radio.example.com/program/seg_0.aac",
                "https://radio.example.com/program/seg_1.aac",
                "https://radio.example.com/program/seg_2.aac",
            ]
        );
    }

    #[test]
    fn empty_media_playlist_is_not_an_error() {
        let segments = list_segments(EMPTY_MEDIA.as_bytes()).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn rejects_variant_playlist_as_media() {
        let err = list_segments(SINGLE_VARIANT.as_bytes()).unwrap_err();
        assert!(matches!(err, ChunklistError::NotMedia));
    }

    #[test]
    fn rejects_garbage_as_media() {
        assert!(list_segments(b"\x00\x01\x02").is_err());
    }
}
