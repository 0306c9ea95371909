//! Text renderers turning fetched account data into persona material

use crate::social::{CommentDetail, MessageDetail, PostDetail};

const PERSONA_TEMPLATE: &str = r#"You are given a concatenated string containing past Instagram posts, comments, captions, and private messages from a single account:
<START_OF_CONTENT>
{content}
Post images are attached to this instruction.
<END_OF_CONTENT>
Your task is to extract the identity of this account. You will use this summary to guide your responses to future comments or DMs in a tone and style consistent with the account.

Please be sure to extract the following:

1. Account Topic
What is the main theme or subject of this Instagram account?
(e.g., fitness, baking, digital art, small business marketing tips, etc.)

2. Audience Description
What type of audience is this account targeting?
(e.g., amateur bakers, Gen Z creatives, small business owners, etc.)

3. Writing Style & Tone
What is the tone and writing style used in captions and replies?
Include examples of quirks, emojis, catchphrases, humor, or specific expressions.

4. Typical Topics & Themes
List a few recurring content categories or subjects discussed.

5. Notable Values or Opinions
Does the account express any opinions, beliefs, or consistent values?

6. Call-to-Actions / Business Goals (if any)
Does the account try to sell something, promote a brand, grow engagement, or offer any services?

7. Voice Emulation Summary
Brief understanding on how to replicate the account's voice in future replies.

In the queries you will be asked to write replies to a provided comment or message that was sent to the account.

General recommendations:
1) Never mention that you are AI. Your responses must never include warnings or disclaimers such as "As an AI" or "As a large language model". Just skip to the answer.
2) ONLY INCLUDE THE EXACT SUGGESTED RESPONSE in your output. Do not include any other text.
3) Never make any promises or guarantees that are not explicitly stated in the description of the account."#;

pub fn render_post(post: &PostDetail) -> String {
    let caption = post.caption.as_deref().unwrap_or("");
    match post.image_url() {
        Some(url) => format!(
            "Instagram post with text: \"{}\" and related image: {}",
            caption, url
        ),
        None => format!("Instagram post with text: \"{}\"", caption),
    }
}

pub fn render_comment(comment: &CommentDetail) -> String {
    format!("Comment from {}: \"{}\"", comment.author_name(), comment.text)
}

/// Messages sent by `account_id` read "from user to X", the rest "from X to user"
pub fn render_dialogs(dialogs: &[Vec<MessageDetail>], account_id: &str) -> String {
    let mut text = String::from("Here is user private dialog:\n");
    for message in dialogs.iter().flatten() {
        if message.from.id == account_id {
            let recipient = message
                .first_recipient()
                .map(|to| to.display_name())
                .unwrap_or("unknown");
            text.push_str(&format!("{} from user to {}\n", message.message, recipient));
        } else {
            text.push_str(&format!(
                "{} from {} to user\n",
                message.message,
                message.from.display_name()
            ));
        }
    }
    text
}

pub fn render_persona(pieces: &[String]) -> String {
    PERSONA_TEMPLATE.replace("{content}", &pieces.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::{MediaType, Participant, Recipients};

    fn message(id: &str, from: (&str, &str), to: (&str, &str), text: &str) -> MessageDetail {
        MessageDetail {
            id: id.to_string(),
            created_time: "2025-05-01T10:00:00+0000".to_string(),
            from: Participant {
                id: from.0.to_string(),
                username: Some(from.1.to_string()),
            },
            to: Recipients {
                data: vec![Participant {
                    id: to.0.to_string(),
                    username: Some(to.1.to_string()),
                }],
            },
            message: text.to_string(),
        }
    }

    #[test]
    fn test_render_image_post() {
        let post = PostDetail {
            id: "p1".to_string(),
            caption: Some("Fresh loaves".to_string()),
            media_type: MediaType::Image,
            media_url: Some("https://cdn.example/p1.jpg".to_string()),
            permalink: None,
            timestamp: "2025-04-30T08:00:00+0000".to_string(),
        };
        assert_eq!(
            render_post(&post),
            "Instagram post with text: \"Fresh loaves\" and related image: https://cdn.example/p1.jpg"
        );
    }

    #[test]
    fn test_render_dialog_direction() {
        let dialogs = vec![vec![
            message("m1", ("77", "alice"), ("42", "bakery"), "Are you open sunday?"),
            message("m2", ("42", "bakery"), ("77", "alice"), "Yes, 8 to 2!"),
        ]];

        let text = render_dialogs(&dialogs, "42");
        assert!(text.contains("Are you open sunday? from alice to user\n"));
        assert!(text.contains("Yes, 8 to 2! from user to alice\n"));
    }

    #[test]
    fn test_persona_embeds_content() {
        let persona = render_persona(&["line one".to_string(), "line two".to_string()]);
        assert!(persona.contains("<START_OF_CONTENT>\nline one\nline two\n"));
        assert!(persona.contains("Voice Emulation Summary"));
    }
}
