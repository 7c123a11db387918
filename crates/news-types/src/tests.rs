#[cfg(test)]
mod tests {
    use crate::message::*;
    use crate::event::*;
    use crate::api::*;
    use crate::config::*;
    use crate::session::*;
    use crate::error::*;

    // ─── Message Tests ───────────────────────────────────────

    #[test]
    fn test_message_user() {
        let msg = Message::user("1", "Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(!msg.streaming);
        assert!(msg.metadata.is_none());
        assert!(!msg.timestamp.is_empty());
    }

    #[test]
    fn test_message_streaming_assistant_is_open() {
        let msg = Message::streaming_assistant("2", "Hel");
        assert!(msg.is_open());
        assert!(!Message::assistant("3", "done").is_open());
        assert!(!Message::error("4", "boom").is_open());
    }

    #[test]
    fn test_message_with_empty_metadata_is_dropped() {
        let msg = Message::assistant("1", "hi").with_metadata(Some(MessageMetadata::default()));
        assert!(msg.metadata.is_none());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), r#""assistant""#);
        assert_eq!(serde_json::to_string(&Role::Error).unwrap(), r#""error""#);
    }

    #[test]
    fn test_role_accepts_bot_alias() {
        let role: Role = serde_json::from_str(r#""bot""#).unwrap();
        assert_eq!(role, Role::Assistant);
    }

    #[test]
    fn test_history_message_defaults() {
        let json = r#"{"role":"assistant","content":"Markets rallied."}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(msg.id.is_empty());
        assert!(!msg.streaming);
        assert_eq!(msg.content, "Markets rallied.");
    }

    #[test]
    fn test_context_snippet_text_alias() {
        let json = r#"{"text":"Rates held","score":0.87,"source":"Reuters"}"#;
        let snippet: ContextSnippet = serde_json::from_str(json).unwrap();
        assert_eq!(snippet.content, "Rates held");
        assert!((snippet.score - 0.87).abs() < f64::EPSILON);
        assert_eq!(snippet.source.as_deref(), Some("Reuters"));
    }

    // ─── Event Tests ─────────────────────────────────────────

    #[test]
    fn test_server_frame_chunk() {
        let json = r#"{"event":"message_chunk","data":{"chunk":"News ","isComplete":false,"timestamp":"2026-01-01T00:00:00Z"}}"#;
        let frame: ServerFrame = serde_json::from_str(json).unwrap();
        match frame {
            ServerFrame::MessageChunk(c) => {
                assert_eq!(c.chunk, "News ");
                assert!(!c.is_complete);
            }
            other => panic!("Wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_server_frame_typing() {
        let frame: ServerFrame = serde_json::from_str(r#"{"event":"typing","data":true}"#).unwrap();
        assert_eq!(frame, ServerFrame::Typing(true));
    }

    #[test]
    fn test_server_frame_complete() {
        let json = r#"{"event":"message_complete","data":{"fullResponse":"Authoritative"}}"#;
        let frame: ServerFrame = serde_json::from_str(json).unwrap();
        let event: TransportEvent = frame.into();
        match event {
            TransportEvent::Complete(done) => {
                assert_eq!(done.full_response.as_deref(), Some("Authoritative"));
            }
            other => panic!("Wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_server_frame_error_string_or_object() {
        let a: ServerFrame = serde_json::from_str(r#"{"event":"error","data":"boom"}"#).unwrap();
        let b: ServerFrame =
            serde_json::from_str(r#"{"event":"error","data":{"message":"boom"}}"#).unwrap();
        let a: TransportEvent = a.into();
        let b: TransportEvent = b.into();
        assert_eq!(a, b);
    }

    #[test]
    fn test_client_frame_join_session() {
        let json = serde_json::to_string(&ClientFrame::JoinSession("s1".to_string())).unwrap();
        assert_eq!(json, r#"{"event":"join_session","data":"s1"}"#);
    }

    #[test]
    fn test_client_frame_send_message() {
        let frame = ClientFrame::SendMessage(OutboundMessage {
            session_id: "s1".to_string(),
            message: "hello".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        });
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""event":"send_message""#));
        assert!(json.contains(r#""sessionId":"s1""#));
    }

    #[test]
    fn test_event_kind_matches_variant() {
        assert_eq!(TransportEvent::Typing { active: true }.kind(), EventKind::Typing);
        assert_eq!(TransportEvent::Chunk(ChunkPayload::partial("a")).kind(), EventKind::Chunk);
        assert_eq!(
            TransportEvent::ConnectionFailed { attempts: 5 }.kind(),
            EventKind::ConnectionFailed
        );
        assert_eq!(EventKind::ALL.len(), 9);
    }

    #[test]
    fn test_connection_state_default() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    // ─── API Tests ───────────────────────────────────────────

    #[test]
    fn test_create_session_envelope() {
        let json = r#"{"success":true,"data":{"sessionId":"abc-123"}}"#;
        let env: ApiEnvelope<CreatedSession> = serde_json::from_str(json).unwrap();
        assert_eq!(env.data.session_id, "abc-123");
        assert_eq!(env.success, Some(true));
    }

    #[test]
    fn test_chat_reply_metadata() {
        let json = r#"{"data":{"botResponse":"Stocks rose.","timestamp":"t","context":[{"content":"Dow up","score":0.9,"source":"AP"}],"source":"rag"}}"#;
        let env: ApiEnvelope<ChatReply> = serde_json::from_str(json).unwrap();
        let metadata = env.data.metadata().unwrap();
        assert_eq!(metadata.context.len(), 1);
        assert_eq!(metadata.source.as_deref(), Some("rag"));
    }

    #[test]
    fn test_chat_reply_without_context_has_no_metadata() {
        let reply = ChatReply {
            bot_response: "hi".to_string(),
            ..ChatReply::default()
        };
        assert!(reply.metadata().is_none());
    }

    #[test]
    fn test_chat_request_wire_names() {
        let req = ChatRequest {
            message: "hi".to_string(),
            session_id: "s1".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"message":"hi","sessionId":"s1"}"#);
    }

    #[test]
    fn test_server_stats_keeps_unknown_fields() {
        let json = r#"{"totalSessions":4,"activeSessions":2,"cacheHits":10}"#;
        let stats: ServerStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_sessions, 4);
        assert_eq!(stats.total_messages, 0);
        assert_eq!(stats.extra["cacheHits"], 10);
    }

    #[test]
    fn test_health_report() {
        let report: HealthReport =
            serde_json::from_str(r#"{"status":"ok","uptime":12}"#).unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.details["uptime"], 12);
    }

    #[test]
    fn test_error_message_from_body() {
        assert_eq!(
            error_message_from_body(r#"{"error":"Message too long"}"#).as_deref(),
            Some("Message too long")
        );
        assert_eq!(
            error_message_from_body(r#"{"error":{"message":"Rate limited"}}"#).as_deref(),
            Some("Rate limited")
        );
        assert_eq!(
            error_message_from_body(r#"{"message":"Bad session"}"#).as_deref(),
            Some("Bad session")
        );
        assert!(error_message_from_body("<html>").is_none());
        assert!(error_message_from_body(r#"{"error":""}"#).is_none());
    }

    // ─── Config Tests ────────────────────────────────────────

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.max_message_length, 500);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.typing_timeout_ms, 10_000);
        assert_eq!(config.delivery, DeliveryMode::Http);
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn test_partial_config_json() {
        let config =
            ClientConfig::from_json(r#"{"api_base_url":"https://news.example/","delivery":"socket"}"#)
                .unwrap();
        assert_eq!(config.delivery, DeliveryMode::Socket);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.api_base_url, "https://news.example/");
    }

    #[test]
    fn test_reconnect_delays_double_and_cap() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u64> = (1..=5).map(|a| policy.delay_for(a)).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 5_000, 5_000]);
        assert_eq!(policy.delay_for(100), 5_000);
    }

    #[test]
    fn test_delivery_mode_labels() {
        assert_eq!(DeliveryMode::Http.label(), "HTTP");
        assert_eq!(DeliveryMode::Socket.label(), "WebSocket");
    }

    // ─── Session Tests ───────────────────────────────────────

    #[test]
    fn test_snapshot_stats() {
        let messages = vec![
            Message::user("1", "What happened today?"),
            Message::assistant("2", "News update."),
            Message::error("3", "Network down"),
        ];
        let snapshot = SessionSnapshot::new(Some("s1".to_string()), messages);
        assert_eq!(snapshot.stats.total_messages, 3);
        assert_eq!(snapshot.stats.user_messages, 1);
        assert_eq!(snapshot.stats.assistant_messages, 1);
        assert_eq!(snapshot.stats.error_messages, 1);
        assert!(!snapshot.exported_at.is_empty());
    }

    #[test]
    fn test_snapshot_json_uses_camel_case() {
        let snapshot = SessionSnapshot::new(Some("s1".to_string()), vec![]);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("sessionId"));
        assert!(json.contains("exportedAt"));
        assert!(json.contains("totalMessages"));
    }

    // ─── Error Tests ─────────────────────────────────────────

    #[test]
    fn test_error_display() {
        assert_eq!(
            ChatError::Validation("Message cannot be empty".to_string()).to_string(),
            "Validation error: Message cannot be empty"
        );
        assert_eq!(
            ChatError::ConnectionFailed { attempts: 5 }.to_string(),
            "Connection failed after 5 reconnection attempts"
        );
        assert_eq!(ChatError::Cancelled.to_string(), "Cancelled");
    }

    #[test]
    fn test_server_error_message_verbatim_or_fallback() {
        let err = ChatError::Server { status: 400, message: Some("Message too long".to_string()) };
        assert_eq!(err.user_message(), "Message too long");

        let err = ChatError::Server { status: 500, message: None };
        assert_eq!(err.user_message(), GENERIC_SERVER_ERROR);
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{{invalid}}").unwrap_err();
        let err: ChatError = serde_err.into();
        assert!(matches!(err, ChatError::Serialization(_)));
    }
}
