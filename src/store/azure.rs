//! Azure Blob Storage backend over the REST API.
//!
//! Uses the two container operations the sync engine needs: List Blobs
//! (`restype=container&comp=list`, XML, paginated via `NextMarker`) and Get
//! Blob. Authorization is a pre-built SAS query string appended verbatim to
//! every request; credential lifecycle is the operator's problem.

use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, Url};
use tokio::io::AsyncWriteExt;

use super::error::StoreError;
use super::{ObjectStore, RemoteObject};

pub struct AzureBlobStore {
    client: Client,
    endpoint: String,
    container: String,
    sas: Option<String>,
}

impl AzureBlobStore {
    /// `endpoint` without a trailing slash; `sas` without the leading `?`.
    pub fn new(endpoint: String, container: String, sas: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            container,
            sas,
        }
    }

    fn container_url(&self) -> Result<Url, StoreError> {
        Url::parse(&format!("{}/{}", self.endpoint, self.container))
            .map_err(|e| StoreError::InvalidUrl(e.to_string()))
    }

    fn list_url(&self, prefix: &str, marker: Option<&str>) -> Result<Url, StoreError> {
        let mut url = self.container_url()?;
        url.query_pairs_mut()
            .append_pair("restype", "container")
            .append_pair("comp", "list")
            .append_pair("prefix", prefix);
        if let Some(marker) = marker {
            url.query_pairs_mut().append_pair("marker", marker);
        }
        self.append_sas(&mut url);
        Ok(url)
    }

    fn blob_url(&self, name: &str) -> Result<Url, StoreError> {
        let mut url = self.container_url()?;
        url.set_path(&format!("/{}/{}", self.container, name));
        self.append_sas(&mut url);
        Ok(url)
    }

    // The SAS string is already percent-encoded; appending through
    // query_pairs_mut would encode it a second time.
    fn append_sas(&self, url: &mut Url) {
        if let Some(sas) = &self.sas {
            let query = match url.query() {
                Some(existing) => format!("{}&{}", existing, sas),
                None => sas.clone(),
            };
            url.set_query(Some(&query));
        }
    }
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StoreError> {
        let mut objects = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let url = self.list_url(prefix, marker.as_deref())?;
            let response = self.client.get(url).send().await.map_err(|source| {
                StoreError::Http {
                    source,
                    name: prefix.to_string(),
                }
            })?;

            if !response.status().is_success() {
                return Err(StoreError::HttpStatus {
                    status: response.status().as_u16(),
                    name: prefix.to_string(),
                });
            }

            let body = response.bytes().await.map_err(|source| StoreError::Http {
                source,
                name: prefix.to_string(),
            })?;

            let page = parse_list_blobs(&body)?;
            objects.extend(page.objects);

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(objects)
    }

    async fn fetch(&self, name: &str, dest: &Path) -> Result<u64, StoreError> {
        let url = self.blob_url(name)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                source,
                name: name.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(StoreError::HttpStatus {
                status: response.status().as_u16(),
                name: name.to_string(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| StoreError::Http {
                source,
                name: name.to_string(),
            })?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

struct ListPage {
    objects: Vec<RemoteObject>,
    next_marker: Option<String>,
}

/// Element whose text content is being collected.
#[derive(PartialEq)]
enum Field {
    None,
    Name,
    Size,
    Marker,
}

fn local_name(name: &[u8]) -> &[u8] {
    name.rsplit(|b| *b == b':').next().unwrap_or(name)
}

/// Parse one List Blobs response page.
///
/// Entries whose name carries a trailing `/` are virtual directory markers
/// and are excluded. An empty or absent `NextMarker` means the listing is
/// complete.
fn parse_list_blobs(xml: &[u8]) -> Result<ListPage, StoreError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf: Vec<u8> = Vec::new();

    let mut in_blob = false;
    let mut field = Field::None;
    let mut current_name: Option<String> = None;
    let mut current_size: Option<u64> = None;

    let mut objects = Vec::new();
    let mut next_marker: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"Blob" => {
                    in_blob = true;
                    current_name = None;
                    current_size = None;
                }
                b"Name" if in_blob => field = Field::Name,
                b"Content-Length" if in_blob => field = Field::Size,
                b"NextMarker" if !in_blob => field = Field::Marker,
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| StoreError::InvalidListing(e.to_string()))?;
                match field {
                    Field::Name => current_name = Some(text.into_owned()),
                    Field::Size => {
                        let size = text.trim().parse::<u64>().map_err(|_| {
                            StoreError::InvalidListing(format!(
                                "non-numeric Content-Length '{}'",
                                text
                            ))
                        })?;
                        current_size = Some(size);
                    }
                    Field::Marker => {
                        let text = text.trim();
                        if !text.is_empty() {
                            next_marker = Some(text.to_string());
                        }
                    }
                    Field::None => {}
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"Blob" => {
                    in_blob = false;
                    let name = current_name.take().ok_or_else(|| {
                        StoreError::InvalidListing("blob entry without a Name".to_string())
                    })?;
                    if name.ends_with('/') {
                        buf.clear();
                        continue;
                    }
                    let size = current_size.take().ok_or_else(|| {
                        StoreError::InvalidListing(format!(
                            "blob '{}' without a Content-Length",
                            name
                        ))
                    })?;
                    objects.push(RemoteObject { name, size });
                }
                b"Name" | b"Content-Length" | b"NextMarker" => field = Field::None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(StoreError::InvalidListing(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(ListPage {
        objects,
        next_marker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ContainerName="recordings">
  <Blobs>
    <Blob>
      <Name>live-record/dev1/2024-05-01-10-00-00.flv</Name>
      <Properties>
        <Last-Modified>Wed, 01 May 2024 10:05:00 GMT</Last-Modified>
        <Content-Length>100</Content-Length>
        <Content-Type>video/x-flv</Content-Type>
      </Properties>
    </Blob>
    <Blob>
      <Name>live-record/dev1/</Name>
      <Properties>
        <Content-Length>0</Content-Length>
      </Properties>
    </Blob>
    <Blob>
      <Name>live-record/dev1/2024-05-02-11-30-00.flv</Name>
      <Properties>
        <Content-Length>2048</Content-Length>
      </Properties>
    </Blob>
  </Blobs>
  <NextMarker>marker-token-123</NextMarker>
</EnumerationResults>"#;

    #[test]
    fn test_parse_page_objects_and_marker() {
        let page = parse_list_blobs(PAGE.as_bytes()).unwrap();
        assert_eq!(
            page.objects,
            vec![
                RemoteObject {
                    name: "live-record/dev1/2024-05-01-10-00-00.flv".into(),
                    size: 100,
                },
                RemoteObject {
                    name: "live-record/dev1/2024-05-02-11-30-00.flv".into(),
                    size: 2048,
                },
            ]
        );
        assert_eq!(page.next_marker.as_deref(), Some("marker-token-123"));
    }

    #[test]
    fn test_parse_final_page_has_no_marker() {
        let xml = r#"<EnumerationResults><Blobs></Blobs><NextMarker /></EnumerationResults>"#;
        let page = parse_list_blobs(xml.as_bytes()).unwrap();
        assert!(page.objects.is_empty());
        assert!(page.next_marker.is_none());
    }

    #[test]
    fn test_parse_blob_without_size_is_error() {
        let xml = r#"<EnumerationResults><Blobs><Blob>
            <Name>live-record/dev1/x.flv</Name>
        </Blob></Blobs></EnumerationResults>"#;
        assert!(matches!(
            parse_list_blobs(xml.as_bytes()),
            Err(StoreError::InvalidListing(_))
        ));
    }

    #[test]
    fn test_parse_non_numeric_size_is_error() {
        let xml = r#"<EnumerationResults><Blobs><Blob>
            <Name>x.flv</Name><Properties><Content-Length>big</Content-Length></Properties>
        </Blob></Blobs></EnumerationResults>"#;
        assert!(matches!(
            parse_list_blobs(xml.as_bytes()),
            Err(StoreError::InvalidListing(_))
        ));
    }

    fn test_store(sas: Option<&str>) -> AzureBlobStore {
        AzureBlobStore::new(
            "https://acct.blob.core.windows.net".to_string(),
            "recordings".to_string(),
            sas.map(str::to_string),
        )
    }

    #[test]
    fn test_list_url_query() {
        let store = test_store(None);
        let url = store.list_url("live-record/dev1/", None).unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("restype=container"));
        assert!(query.contains("comp=list"));
        assert!(query.contains("prefix=live-record%2Fdev1%2F"));
        assert!(!query.contains("marker"));
    }

    #[test]
    fn test_list_url_with_marker_and_sas() {
        let store = test_store(Some("sv=2022&sig=abc%2F1"));
        let url = store.list_url("live-record/dev1/", Some("m1")).unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("marker=m1"));
        // SAS appended verbatim, not re-encoded
        assert!(query.ends_with("sv=2022&sig=abc%2F1"));
    }

    #[test]
    fn test_blob_url_keeps_hierarchy() {
        let store = test_store(Some("sig=s"));
        let url = store
            .blob_url("live-record/dev1/2024-05-01-10-00-00.flv")
            .unwrap();
        assert_eq!(
            url.path(),
            "/recordings/live-record/dev1/2024-05-01-10-00-00.flv"
        );
        assert_eq!(url.query(), Some("sig=s"));
    }
}
