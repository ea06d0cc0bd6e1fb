use async_trait::async_trait;
use futures::prelude::*;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use rusoto_s3::{
    CopyObjectRequest, HeadObjectOutput, HeadObjectRequest, ListObjectsV2Output,
    ListObjectsV2Request, S3Client, S3,
};

use super::Error;

const COPY_SOURCE_KEY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// An object as reported by a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub e_tag: Option<String>,
}

#[derive(Debug, Default)]
pub struct ListPage {
    pub objects: Vec<RemoteObject>,
    /// Token for the next page, `None` on the last one.
    pub next: Option<String>,
}

/// Server-side copy that replaces the destination's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCopy {
    pub source_bucket: String,
    pub source_key: String,
    pub destination_bucket: String,
    pub destination_key: String,
    pub content_type: Option<String>,
    pub cache_control: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists one page of `bucket`. An empty prefix lists everything.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage, Error>;

    async fn content_type(&self, bucket: &str, key: &str) -> Result<Option<String>, Error>;

    async fn copy(&self, copy: &ObjectCopy) -> Result<(), Error>;
}

/// Streams every object under `prefix`, fetching pages as they are consumed.
pub fn list_objects<'a, S>(
    store: &'a S,
    bucket: &'a str,
    prefix: &'a str,
) -> stream::BoxStream<'a, Result<RemoteObject, Error>>
where
    S: ObjectStore + ?Sized,
{
    // `None` once the last page has been fetched
    stream::try_unfold(Some(None), move |continuation: Option<Option<String>>| {
        async move {
            let continuation = match continuation {
                Some(c) => c,
                None => return Ok(None),
            };
            let ListPage { objects, next } = store.list_page(bucket, prefix, continuation).await?;
            let objects = stream::iter(objects.into_iter().map(Ok::<_, Error>));
            Ok::<_, Error>(Some((objects, next.map(Some))))
        }
    })
    .try_flatten()
    .boxed()
}

pub struct S3Store {
    s3_client: S3Client,
}

impl S3Store {
    pub fn new(s3_client: S3Client) -> Self {
        Self { s3_client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage, Error> {
        let request = ListObjectsV2Request {
            bucket: bucket.to_string(),
            prefix: Some(prefix.to_string()).filter(|p| !p.is_empty()),
            continuation_token: continuation,
            ..Default::default()
        };
        let ListObjectsV2Output {
            contents,
            next_continuation_token,
            ..
        } = self.s3_client.list_objects_v2(request).await?;
        let objects = contents
            .unwrap_or_default()
            .into_iter()
            .map(|object| {
                let key = object.key.ok_or(Error::MissingField("key"))?;
                Ok(RemoteObject {
                    bucket: bucket.to_string(),
                    key,
                    size: object.size.unwrap_or(0).max(0) as u64,
                    e_tag: object.e_tag,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(ListPage {
            objects,
            next: next_continuation_token,
        })
    }

    async fn content_type(&self, bucket: &str, key: &str) -> Result<Option<String>, Error> {
        let request = HeadObjectRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            ..Default::default()
        };
        let HeadObjectOutput { content_type, .. } = self.s3_client.head_object(request).await?;
        Ok(content_type)
    }

    async fn copy(&self, copy: &ObjectCopy) -> Result<(), Error> {
        let request = CopyObjectRequest {
            bucket: copy.destination_bucket.clone(),
            key: copy.destination_key.clone(),
            copy_source: copy_source(&copy.source_bucket, &copy.source_key),
            content_type: copy.content_type.clone(),
            cache_control: Some(copy.cache_control.clone()),
            metadata_directive: Some("REPLACE".to_string()),
            ..Default::default()
        };
        self.s3_client.copy_object(request).await?;
        Ok(())
    }
}

fn copy_source(bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket, utf8_percent_encode(key, COPY_SOURCE_KEY))
}
