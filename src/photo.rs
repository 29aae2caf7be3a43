// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;

use crate::collab::PhotoSource;
use crate::error::{RevealError, RevealResult};

/// Random-photo response of the photo search service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UnsplashPhoto {
    pub id: Option<String>,
    pub urls: Option<UnsplashUrls>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UnsplashUrls {
    pub raw: Option<String>,
    pub full: Option<String>,
    pub regular: Option<String>,
    pub small: Option<String>,
    pub thumb: Option<String>,
}

impl UnsplashPhoto {
    pub fn from_json(json: &str) -> RevealResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| RevealError::collaborator(format!("parse photo response: {e}")))
    }

    /// Largest usable URL: `full`, then `regular`, then `small`.
    pub fn preferred_url(&self) -> Option<&str> {
        let urls = self.urls.as_ref()?;
        urls.full
            .as_deref()
            .or(urls.regular.as_deref())
            .or(urls.small.as_deref())
    }
}

/// Hands out a fixed list of URLs in rotation.
#[derive(Debug, Default)]
pub struct StaticPhotoSource {
    urls: Vec<String>,
    next: AtomicUsize,
}

impl StaticPhotoSource {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            next: AtomicUsize::new(0),
        }
    }
}

impl PhotoSource for StaticPhotoSource {
    fn fetch_random_photo_url(&self, _query: Option<&str>) -> RevealResult<String> {
        if self.urls.is_empty() {
            return Err(RevealError::collaborator("no photo urls configured"));
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.urls.len();
        Ok(self.urls[i].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_full_then_regular_then_small() {
        let photo = UnsplashPhoto::from_json(
            r#"{"id": "abc", "urls": {"raw": "r", "full": "f", "regular": "g", "small": "s", "thumb": "t"}}"#,
        )
        .unwrap();
        assert_eq!(photo.id.as_deref(), Some("abc"));
        assert_eq!(photo.preferred_url(), Some("f"));

        let photo = UnsplashPhoto::from_json(r#"{"urls": {"regular": "g", "small": "s"}}"#).unwrap();
        assert_eq!(photo.preferred_url(), Some("g"));

        let photo = UnsplashPhoto::from_json(r#"{"urls": {"small": "s", "thumb": "t"}}"#).unwrap();
        assert_eq!(photo.preferred_url(), Some("s"));
    }

    #[test]
    fn missing_urls_have_no_preference() {
        assert_eq!(UnsplashPhoto::from_json(r#"{"id": "x"}"#).unwrap().preferred_url(), None);
        let thumb_only = UnsplashPhoto::from_json(r#"{"urls": {"thumb": "t"}}"#).unwrap();
        assert_eq!(thumb_only.preferred_url(), None);
    }

    #[test]
    fn bad_json_is_a_collaborator_error() {
        assert!(matches!(
            UnsplashPhoto::from_json("[]"),
            Err(RevealError::Collaborator(_))
        ));
    }

    #[test]
    fn static_source_rotates() {
        let source = StaticPhotoSource::new(vec!["a".into(), "b".into()]);
        let got: Vec<_> = (0..3)
            .map(|_| source.fetch_random_photo_url(None).unwrap())
            .collect();
        assert_eq!(got, ["a", "b", "a"]);
        assert!(StaticPhotoSource::default()
            .fetch_random_photo_url(Some("mountains"))
            .is_err());
    }
}
