mod status;
mod utils;

use std::io;

use bytes::{BufMut, BytesMut};
use rkyv::AlignedVec;
pub use status::{
    ArchivedErrorCode,
    ArchivedStatus,
    ArchivedWorkError,
    ArchivedWorkErrorKind,
    ErrorCode,
    Status,
    WorkError,
    WorkErrorKind,
};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::net::utils::{HEADER_SIZE, VALUE_HEADER_SIZE};
use crate::protocol::{RequestKind, Response, ResponseKind};
use crate::{Value, MAX_PARAMETERS};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// A value could not be encoded or decoded.
pub enum CodecError {
    #[error("Failed to archive value.")]
    Serialize,

    #[error("Invalid value payload was provided to be deserialized.")]
    Invalid,

    #[error("Value checksum does not match its payload.")]
    ChecksumMismatch,

    #[error("Unsupported value format version: {0}")]
    UnsupportedVersion(u8),

    #[error("Value of {0} bytes exceeds the maximum value size.")]
    TooLarge(usize),

    #[error("Invalid number of parameters: {0}")]
    InvalidParameterCount(i32),

    #[error("{kind} expects {expected} arguments but {actual} were provided.")]
    ArgumentCount {
        kind: RequestKind,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, thiserror::Error)]
/// A frame could not be read from the connection.
pub enum FrameError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    #[error("Codec Error: {0}")]
    Codec(#[from] CodecError),

    #[error("Unknown response received: {0}")]
    UnknownResponse(i32),
}

/// A request frame as read off the wire.
///
/// The opcode is kept raw so unknown commands can still be answered.
pub(crate) struct RawRequest {
    pub(crate) opcode: i32,
    pub(crate) args: Vec<Value>,
}

/// Serializes a request frame into a buffer.
pub(crate) fn serialize_request(
    kind: RequestKind,
    args: &[Value],
) -> Result<Vec<u8>, CodecError> {
    if args.len() != kind.num_parameters() {
        return Err(CodecError::ArgumentCount {
            kind,
            expected: kind.num_parameters(),
            actual: args.len(),
        });
    }

    let mut buffer = BytesMut::with_capacity(HEADER_SIZE);
    utils::serialize_header(&mut buffer, kind.opcode(), kind.num_parameters());
    for arg in args {
        utils::serialize_value(&mut buffer, arg)?;
    }

    Ok(buffer.to_vec())
}

/// Reads a single request frame from the connection.
pub(crate) async fn read_request<R>(reader: &mut R) -> Result<RawRequest, FrameError>
where
    R: AsyncRead + Unpin,
{
    let header = read_header(reader).await?;

    let num_params = usize::try_from(header.num_params)
        .ok()
        .filter(|n| *n <= MAX_PARAMETERS)
        .ok_or(CodecError::InvalidParameterCount(header.num_params))?;

    let mut args = Vec::with_capacity(num_params);
    for _ in 0..num_params {
        args.push(read_value::<_, Value>(reader).await?);
    }

    Ok(RawRequest {
        opcode: header.opcode,
        args,
    })
}

/// Serializes a response frame into a buffer.
///
/// If the failure payload cannot be archived a generic error is produced
/// in its place.
pub(crate) fn serialize_response(response: &Response) -> Vec<u8> {
    match try_serialize_response(response) {
        Ok(buffer) => buffer,
        Err(error) => {
            warn!(error = ?error, "Failed to serialize response payload, returning default...");
            let fallback = Response::GenericError(Status::internal(format!(
                "Failed to serialize response: {error}"
            )));
            try_serialize_response(&fallback).unwrap_or_else(|_| {
                let mut buffer = BytesMut::with_capacity(HEADER_SIZE);
                utils::serialize_header(
                    &mut buffer,
                    ResponseKind::GenericError.opcode(),
                    0,
                );
                buffer.to_vec()
            })
        },
    }
}

fn try_serialize_response(response: &Response) -> Result<Vec<u8>, CodecError> {
    let kind = response.kind();
    let mut buffer = BytesMut::with_capacity(HEADER_SIZE);
    utils::serialize_header(&mut buffer, kind.opcode(), kind.num_parameters());

    match response {
        Response::VoidOk => {},
        Response::LongOk(value) => buffer.put_i64(*value),
        Response::WorkError(error) => utils::serialize_value(&mut buffer, error)?,
        Response::GenericError(status) => utils::serialize_value(&mut buffer, status)?,
    }

    Ok(buffer.to_vec())
}

/// Reads a single response frame from the connection.
pub(crate) async fn read_response<R>(reader: &mut R) -> Result<Response, FrameError>
where
    R: AsyncRead + Unpin,
{
    let header = read_header(reader).await?;

    let kind = ResponseKind::from_opcode(header.opcode)
        .ok_or(FrameError::UnknownResponse(header.opcode))?;

    let response = match kind {
        ResponseKind::VoidOk => Response::VoidOk,
        ResponseKind::LongOk => Response::LongOk(reader.read_i64().await?),
        ResponseKind::WorkError => Response::WorkError(read_value(reader).await?),
        // The last resort failure frame carries no status.
        ResponseKind::GenericError if header.num_params == 0 => Response::GenericError(
            Status::internal("Peer failed without providing a reason."),
        ),
        ResponseKind::GenericError => Response::GenericError(read_value(reader).await?),
    };

    Ok(response)
}

async fn read_header<R>(reader: &mut R) -> io::Result<utils::FrameHeader>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0; HEADER_SIZE];
    reader.read_exact(&mut header).await?;
    Ok(utils::parse_header(header))
}

async fn read_value<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: rkyv::Archive + 'static,
    T::Archived: for<'a> rkyv::bytecheck::CheckBytes<
            rkyv::validation::validators::DefaultValidator<'a>,
        > + rkyv::Deserialize<T, rkyv::de::deserializers::SharedDeserializeMap>,
{
    let mut header = [0; VALUE_HEADER_SIZE];
    reader.read_exact(&mut header).await?;
    let header = utils::parse_value_header(header)?;

    let mut archive = AlignedVec::with_capacity(header.len);
    archive.resize(header.len, 0);
    reader.read_exact(archive.as_mut_slice()).await?;

    let value = utils::deserialize_value(header, &archive)?;
    Ok(value)
}
