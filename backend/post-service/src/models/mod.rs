/// Data models for post-service
///
/// This module defines structures for:
/// - Post: stored posts, including legacy single-type fields and mixed-content blocks
/// - PostBlock / IncomingBlock: typed content blocks (stored vs. request form)
/// - NewPost: validated post-creation input, decoded before business logic runs
/// - PostView / CommentView / UserProfile: API-facing expanded representations
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// One unit of mixed-content post body, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PostBlock {
    #[serde(rename_all = "camelCase")]
    Image { image_url: String },
    #[serde(rename_all = "camelCase")]
    Code { code_snippet: String, language: String },
}

/// One unit of mixed-content post body, as received.
///
/// Unknown block types decode into `Unknown` so the service can record how
/// many were dropped instead of silently losing them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IncomingBlock {
    #[serde(rename_all = "camelCase")]
    Image {
        #[serde(default)]
        image_data: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Code {
        #[serde(default)]
        code_snippet: String,
        #[serde(default)]
        language: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// Legacy single-type content fields shared by all creation variants.
///
/// A post of any declared type may still carry the other fields; they are
/// persisted as-is, matching the pre-block wire format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyContent {
    pub text: Option<String>,
    pub img: Option<String>,
    pub images: Vec<String>,
    pub code_snippet: Option<String>,
    pub language: Option<String>,
}

/// Validated post-creation input.
///
/// Decoding a creation request into this union applies the type-specific
/// required-field rules up front; handlers never see a half-valid payload.
/// A present block list, even an empty one, bypasses legacy validation
/// entirely, even when the legacy fields present would otherwise be
/// rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum NewPost {
    LegacyText(LegacyContent),
    LegacyImage(LegacyContent),
    LegacyCode(LegacyContent),
    BlockList {
        blocks: Vec<IncomingBlock>,
        legacy: LegacyContent,
        declared_type: String,
    },
}

impl NewPost {
    /// The post-type discriminator persisted with the post.
    pub fn post_type(&self) -> &str {
        match self {
            NewPost::LegacyText(_) => "text",
            NewPost::LegacyImage(_) => "image",
            NewPost::LegacyCode(_) => "code",
            NewPost::BlockList { declared_type, .. } => declared_type,
        }
    }

    pub fn legacy(&self) -> &LegacyContent {
        match self {
            NewPost::LegacyText(legacy)
            | NewPost::LegacyImage(legacy)
            | NewPost::LegacyCode(legacy) => legacy,
            NewPost::BlockList { legacy, .. } => legacy,
        }
    }

    /// Build a validated creation input from the raw wire fields.
    ///
    /// A present `blocks` key wins over legacy validation, even when the
    /// list is empty (an empty list processes to nothing and stores no
    /// blocks). Otherwise the declared type selects which content field is
    /// required. Missing or unrecognized types normalize to "text", keeping
    /// the stored discriminator closed over text/image/code.
    pub fn decode(
        post_type: Option<String>,
        blocks: Option<Vec<IncomingBlock>>,
        legacy: LegacyContent,
    ) -> Result<Self> {
        let declared = match post_type.as_deref() {
            Some("image") => "image",
            Some("code") => "code",
            _ => "text",
        };

        if let Some(blocks) = blocks {
            return Ok(NewPost::BlockList {
                blocks,
                legacy,
                declared_type: declared.to_string(),
            });
        }

        match declared {
            "code" => {
                if legacy
                    .code_snippet
                    .as_deref()
                    .map_or(true, |c| c.trim().is_empty())
                {
                    return Err(AppError::BadRequest(
                        "Code post must have code snippet".to_string(),
                    ));
                }
                Ok(NewPost::LegacyCode(legacy))
            }
            "image" => {
                if legacy.images.is_empty() {
                    return Err(AppError::BadRequest(
                        "Image post must have at least one image".to_string(),
                    ));
                }
                Ok(NewPost::LegacyImage(legacy))
            }
            _ => {
                if legacy.text.as_deref().map_or(true, |t| t.trim().is_empty()) {
                    return Err(AppError::BadRequest(
                        "Text post must have content".to_string(),
                    ));
                }
                Ok(NewPost::LegacyText(legacy))
            }
        }
    }
}

/// A stored post row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: Option<String>,
    pub img: Option<String>,
    pub images: Json<Vec<String>>,
    pub code_snippet: Option<String>,
    pub language: Option<String>,
    pub post_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Json<Vec<PostBlock>>>,
    pub created_at: DateTime<Utc>,
}

/// Public user projection. Never carries the password hash.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub profile_img_url: Option<String>,
}

/// A comment with its author expanded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub text: String,
    pub user: UserProfile,
    pub created_at: DateTime<Utc>,
}

/// A post with author, comments, and likers expanded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub user: UserProfile,
    pub text: Option<String>,
    pub img: Option<String>,
    pub images: Vec<String>,
    pub code_snippet: Option<String>,
    pub language: Option<String>,
    pub post_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<PostBlock>>,
    pub comments: Vec<CommentView>,
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl PostView {
    pub fn assemble(
        post: Post,
        user: UserProfile,
        comments: Vec<CommentView>,
        likes: Vec<Uuid>,
    ) -> Self {
        Self {
            id: post.id,
            user,
            text: post.text,
            img: post.img,
            images: post.images.0,
            code_snippet: post.code_snippet,
            language: post.language,
            post_type: post.post_type,
            blocks: post.blocks.map(|b| b.0),
            comments,
            likes,
            created_at: post.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_legacy(text: &str) -> LegacyContent {
        LegacyContent {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn text_post_requires_content() {
        let err = NewPost::decode(Some("text".into()), None, LegacyContent::default());
        assert!(matches!(err, Err(AppError::BadRequest(msg)) if msg.contains("Text post")));

        let err = NewPost::decode(Some("text".into()), None, text_legacy("   "));
        assert!(matches!(err, Err(AppError::BadRequest(_))));

        let ok = NewPost::decode(Some("text".into()), None, text_legacy("hello")).unwrap();
        assert_eq!(ok.post_type(), "text");
    }

    #[test]
    fn missing_post_type_defaults_to_text() {
        let ok = NewPost::decode(None, None, text_legacy("hello")).unwrap();
        assert!(matches!(ok, NewPost::LegacyText(_)));
    }

    #[test]
    fn code_post_requires_snippet() {
        let err = NewPost::decode(Some("code".into()), None, LegacyContent::default());
        assert!(matches!(err, Err(AppError::BadRequest(msg)) if msg.contains("Code post")));

        let legacy = LegacyContent {
            code_snippet: Some("fn main() {}".to_string()),
            ..Default::default()
        };
        let ok = NewPost::decode(Some("code".into()), None, legacy).unwrap();
        assert_eq!(ok.post_type(), "code");
    }

    #[test]
    fn image_post_requires_at_least_one_image() {
        let err = NewPost::decode(Some("image".into()), None, LegacyContent::default());
        assert!(matches!(err, Err(AppError::BadRequest(msg)) if msg.contains("Image post")));

        let legacy = LegacyContent {
            images: vec!["data:image/png;base64,AAAA".to_string()],
            ..Default::default()
        };
        let ok = NewPost::decode(Some("image".into()), None, legacy).unwrap();
        assert_eq!(ok.post_type(), "image");
    }

    #[test]
    fn unrecognized_post_type_normalizes_to_text() {
        let ok = NewPost::decode(Some("poll".into()), None, text_legacy("hello")).unwrap();
        assert!(matches!(ok, NewPost::LegacyText(_)));
        assert_eq!(ok.post_type(), "text");

        // Normalized posts still take the text content rule
        let err = NewPost::decode(Some("poll".into()), None, LegacyContent::default());
        assert!(matches!(err, Err(AppError::BadRequest(msg)) if msg.contains("Text post")));
    }

    #[test]
    fn blocks_bypass_legacy_validation() {
        // Empty text would fail the text rule, but a block list wins.
        let blocks = vec![IncomingBlock::Code {
            code_snippet: "print(1)".to_string(),
            language: None,
        }];
        let ok = NewPost::decode(Some("text".into()), Some(blocks), LegacyContent::default());
        assert!(matches!(ok, Ok(NewPost::BlockList { .. })));
    }

    #[test]
    fn empty_block_list_still_bypasses_legacy_validation() {
        // Validation is gated on the blocks key being absent, not on the
        // list being non-empty; [] creates a post with no stored blocks.
        let ok = NewPost::decode(Some("text".into()), Some(vec![]), LegacyContent::default());
        assert!(matches!(
            ok,
            Ok(NewPost::BlockList { ref blocks, .. }) if blocks.is_empty()
        ));
    }

    #[test]
    fn unknown_block_types_decode_as_unknown() {
        let raw = r#"[
            {"type": "image", "imageData": "data:image/png;base64,AAAA"},
            {"type": "poll", "question": "?"},
            {"type": "code", "codeSnippet": "x = 1"}
        ]"#;
        let blocks: Vec<IncomingBlock> = serde_json::from_str(raw).unwrap();
        assert_eq!(blocks.len(), 3);
        assert!(matches!(blocks[1], IncomingBlock::Unknown));
        assert!(matches!(
            blocks[2],
            IncomingBlock::Code { ref language, .. } if language.is_none()
        ));
    }

    #[test]
    fn stored_blocks_round_trip_with_camel_case_tags() {
        let block = PostBlock::Image {
            image_url: "https://cdn.example.com/posts/abc".to_string(),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["imageUrl"], "https://cdn.example.com/posts/abc");
    }
}
