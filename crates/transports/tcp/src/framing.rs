//! Wire framing
//!
//! One protocol message per frame: a 4-byte big-endian length prefix
//! followed by the codec's JSON payload. The length cap bounds memory per
//! connection; oversized frames are a protocol error on both sides.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use mediarom_core::{Error, Result};

/// Default cap on a single frame's payload
pub const DEFAULT_MAX_FRAME: usize = 4 * 1024 * 1024;

/// Write one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8], max_frame: usize) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > max_frame {
        return Err(Error::Protocol(format!(
            "outbound frame of {} bytes exceeds limit of {}",
            payload.len(),
            max_frame
        )));
    }
    let mut frame = BytesMut::with_capacity(4 + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame.
///
/// Returns `None` on a clean end of stream at a frame boundary. An end of
/// stream inside a frame is an I/O error; a length over `max_frame` is a
/// protocol error.
pub async fn read_frame<R>(reader: &mut R, max_frame: usize) -> Result<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > max_frame {
        return Err(Error::Protocol(format!(
            "inbound frame of {} bytes exceeds limit of {}",
            len, max_frame
        )));
    }

    let mut payload = BytesMut::zeroed(len);
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload.freeze()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_frame(&mut client, b"hello", DEFAULT_MAX_FRAME)
            .await
            .unwrap();
        write_frame(&mut client, b"", DEFAULT_MAX_FRAME).await.unwrap();
        drop(client);

        assert_eq!(
            read_frame(&mut server, DEFAULT_MAX_FRAME).await.unwrap(),
            Some(Bytes::from_static(b"hello"))
        );
        assert_eq!(
            read_frame(&mut server, DEFAULT_MAX_FRAME).await.unwrap(),
            Some(Bytes::new())
        );
        // clean EOF at a frame boundary
        assert_eq!(read_frame(&mut server, DEFAULT_MAX_FRAME).await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_inbound_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, &[0u8; 64], DEFAULT_MAX_FRAME)
            .await
            .unwrap();

        let err = read_frame(&mut server, 16).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn oversized_outbound_frame_is_rejected() {
        let (mut client, _server) = tokio::io::duplex(1024);
        let err = write_frame(&mut client, &[0u8; 64], 16).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn eof_inside_a_frame_is_an_io_error() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        // header promises 100 bytes, only 3 arrive
        tokio::io::AsyncWriteExt::write_all(&mut client, &100u32.to_be_bytes())
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut client, b"abc")
            .await
            .unwrap();
        drop(client);

        let err = read_frame(&mut server, DEFAULT_MAX_FRAME).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
