//! Best-effort image lookups

use tracing::debug;

use super::ImageProbe;
use crate::domain::AvatarImage;

/// Probe for an image, asking once more if the first answer is `NotReady`
///
/// Images arrive in the background; a second `NotReady` means the caller goes
/// without rather than waiting.
pub fn probe_image(mut probe: impl FnMut() -> ImageProbe) -> Option<AvatarImage> {
    for attempt in 0..2 {
        match probe() {
            ImageProbe::Ready(image) => return Some(image),
            ImageProbe::Unavailable => return None,
            ImageProbe::NotReady => debug!(attempt, "image not ready"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_exactly_once() {
        let mut probes = 0;
        let image = probe_image(|| {
            probes += 1;
            ImageProbe::NotReady
        });
        assert_eq!(image, None);
        assert_eq!(probes, 2);
    }

    #[test]
    fn test_second_probe_can_deliver() {
        let mut answers = vec![
            ImageProbe::Ready(AvatarImage::solid(1, 1, [9; 4])),
            ImageProbe::NotReady,
        ];
        let image = probe_image(|| answers.pop().unwrap_or(ImageProbe::Unavailable));
        assert_eq!(image.map(|i| i.width), Some(1));
    }

    #[test]
    fn test_unavailable_is_not_retried() {
        let mut probes = 0;
        assert_eq!(
            probe_image(|| {
                probes += 1;
                ImageProbe::Unavailable
            }),
            None
        );
        assert_eq!(probes, 1);
    }
}
