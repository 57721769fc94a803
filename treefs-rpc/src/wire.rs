//! Wire protocol: length-prefixed bincode frames, one request and one
//! response per TCP connection.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::RpcError;

/// Upper bound on a single frame, as a sanity check against corrupt length
/// prefixes.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// One remote call as carried on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub interface: String,
    pub method: String,
    /// Encoded argument tuple.
    pub body: Vec<u8>,
}

/// Outcome of one dispatched call, as carried on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub enum Response {
    /// Encoded return value.
    Ok(Vec<u8>),
    /// Encoded application error declared by the interface; decoded and
    /// re-raised on the caller side.
    AppError(Vec<u8>),
    /// The skeleton could not dispatch the request at all.
    Fault(RpcError),
}

impl Response {
    /// Fault for a request whose argument tuple could not be decoded.
    pub fn bad_request(err: RpcError) -> Self {
        match err {
            RpcError::Frame(msg) => Response::Fault(RpcError::BadRequest(msg)),
            other => Response::Fault(other),
        }
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RpcError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| RpcError::Frame(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RpcError> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| RpcError::Frame(e.to_string()))?;
    Ok(value)
}

/// Encodes a typed method outcome into a wire response.
pub fn reply<R: Serialize, E: Serialize>(result: &Result<R, E>) -> Response {
    match result {
        Ok(value) => match encode(value) {
            Ok(bytes) => Response::Ok(bytes),
            Err(err) => Response::Fault(err),
        },
        Err(app_err) => match encode(app_err) {
            Ok(bytes) => Response::AppError(bytes),
            Err(err) => Response::Fault(err),
        },
    }
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", payload.len()),
        ));
    }
    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds limit"),
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Bytes::from(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, b"hello frame").await.unwrap();
        let frame = read_frame(&mut server).await.unwrap();
        assert_eq!(&frame[..], b"hello frame");
    }

    #[tokio::test]
    async fn test_empty_frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(64);
        write_frame(&mut client, b"").await.unwrap();
        let frame = read_frame(&mut server).await.unwrap();
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_length_prefix_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client
            .write_all(&(u32::MAX).to_le_bytes())
            .await
            .unwrap();
        let err = read_frame(&mut server).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_request_encode_decode() {
        let request = Request {
            interface: "test.Calc".to_string(),
            method: "div".to_string(),
            body: encode(&(84i64, 2i64)).unwrap(),
        };
        let bytes = encode(&request).unwrap();
        let decoded: Request = decode(&bytes).unwrap();
        assert_eq!(decoded.interface, "test.Calc");
        assert_eq!(decoded.method, "div");
        let (a, b): (i64, i64) = decode(&decoded.body).unwrap();
        assert_eq!((a, b), (84, 2));
    }

    #[test]
    fn test_reply_encodes_application_error() {
        let outcome: Result<u64, String> = Err("no such file".to_string());
        match reply(&outcome) {
            Response::AppError(bytes) => {
                let msg: String = decode(&bytes).unwrap();
                assert_eq!(msg, "no such file");
            }
            other => panic!("expected AppError, got {other:?}"),
        }
    }
}
