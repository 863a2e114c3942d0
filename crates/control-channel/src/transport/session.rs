//! Serves one accepted connection until the peer disconnects.

use tracing::{debug, warn};

use super::{ConnectionStream, TRANSPORT_TARGET};
use crate::frame::{ErrorCode, Frame, FrameError, FrameKind, read_frame, write_error, write_frame};
use crate::handler::{ConnectionHandler, ServerConnection};

/// Runs the Connected → {message}* → Disconnected lifecycle of a connection.
///
/// Per-message failures are answered on the error channel and never end the
/// session; only stream failures or the peer closing the socket do.
pub(super) fn serve(
    mut stream: ConnectionStream,
    connection: &ServerConnection,
    mut handler: Box<dyn ConnectionHandler>,
    max_send_size: usize,
) {
    debug!(
        target: TRANSPORT_TARGET,
        connection = %connection.id(),
        "connection opened"
    );

    loop {
        let frame = match read_frame(&mut stream, max_send_size) {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(error) if error.is_recoverable() && !error.expects_answer() => {
                warn!(
                    target: TRANSPORT_TARGET,
                    connection = %connection.id(),
                    code = ErrorCode::MessageTooLarge.as_u8(),
                    %error,
                    "rejected fire-and-forget message"
                );
                continue;
            }
            Err(error) if error.is_recoverable() => {
                warn!(
                    target: TRANSPORT_TARGET,
                    connection = %connection.id(),
                    %error,
                    "rejected unreadable frame"
                );
                let code = match error {
                    FrameError::TooLarge { .. } => ErrorCode::MessageTooLarge,
                    FrameError::UnknownKind { .. } | FrameError::Io(_) => {
                        ErrorCode::InvalidArgument
                    }
                };
                if let Err(source) = write_error(&mut stream, code) {
                    warn!(
                        target: TRANSPORT_TARGET,
                        connection = %connection.id(),
                        error = %source,
                        "failed to write error frame"
                    );
                    break;
                }
                continue;
            }
            Err(error) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    connection = %connection.id(),
                    %error,
                    "connection read failed"
                );
                break;
            }
        };

        if let Err(error) =
            handle_frame(&mut stream, connection, handler.as_mut(), frame, max_send_size)
        {
            warn!(
                target: TRANSPORT_TARGET,
                connection = %connection.id(),
                %error,
                "connection write failed"
            );
            break;
        }
    }

    handler.on_disconnect(connection);
    debug!(
        target: TRANSPORT_TARGET,
        connection = %connection.id(),
        "connection closed"
    );
}

fn handle_frame(
    stream: &mut ConnectionStream,
    connection: &ServerConnection,
    handler: &mut dyn ConnectionHandler,
    frame: Frame,
    max_send_size: usize,
) -> Result<(), FrameError> {
    match frame.kind {
        FrameKind::Send => {
            if let Err(error) = handler.on_message_sent(connection, &frame.payload) {
                warn!(
                    target: TRANSPORT_TARGET,
                    connection = %connection.id(),
                    code = error.code().as_u8(),
                    %error,
                    "rejected fire-and-forget message"
                );
            }
            Ok(())
        }
        FrameKind::SendWithReply => {
            match handler.on_message_sent_with_reply(connection, &frame.payload) {
                Ok(reply) if reply.len() > max_send_size => {
                    warn!(
                        target: TRANSPORT_TARGET,
                        connection = %connection.id(),
                        size = reply.len(),
                        max = max_send_size,
                        "reply exceeds maximum message size"
                    );
                    write_error(stream, ErrorCode::MessageTooLarge)
                }
                Ok(reply) => write_frame(stream, FrameKind::Reply, &reply),
                Err(error) => {
                    debug!(
                        target: TRANSPORT_TARGET,
                        connection = %connection.id(),
                        code = error.code().as_u8(),
                        %error,
                        "request rejected"
                    );
                    write_error(stream, error.code())
                }
            }
        }
        FrameKind::Reply | FrameKind::Error => {
            warn!(
                target: TRANSPORT_TARGET,
                connection = %connection.id(),
                kind = %frame.kind,
                "client sent a server-only frame kind"
            );
            write_error(stream, ErrorCode::InvalidArgument)
        }
    }
}
