#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::sender::{Sender, SenderRegistry};
    use crate::{Client, Config, Error, Result};
    use serde::Serialize;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CapturingSender {
        messages: Mutex<Vec<Message>>,
    }

    impl Sender for CapturingSender {
        fn send(&self, message: Message) -> Result<()> {
            self.messages.lock().unwrap().push(message);
            Ok(())
        }
    }

    #[derive(Serialize)]
    struct Order {
        id: u64,
        customer: Customer,
    }

    #[derive(Serialize)]
    struct Customer {
        email: String,
    }

    fn order() -> Order {
        Order {
            id: 17,
            customer: Customer {
                email: "buyer@example.com".to_string(),
            },
        }
    }

    fn capturing_client(format: MessageFormat) -> (Client, Arc<CapturingSender>) {
        let capturing = Arc::new(CapturingSender::default());
        let shared = Arc::clone(&capturing);

        let mut registry = SenderRegistry::default();
        registry.register("capture", move |_: &Config| Ok(Arc::clone(&shared) as Arc<dyn Sender>));

        let config = Config {
            sender: "capture".to_string(),
            message_format: format,
            ..Config::default()
        };

        (Client::with_registry(config, registry).unwrap(), capturing)
    }

    #[test]
    fn test_producer_attributes() {
        let (client, _) = capturing_client(MessageFormat::Json);
        let producer = client.producer(
            ProducerDefinition::<String>::new("test_topic").key_fn(|_| Ok(json!("get_key"))),
        );

        assert_eq!(producer.topic(), "test_topic");
        assert_eq!(producer.format(), MessageFormat::Json);
        assert!(matches!(producer.key(), KeyStrategy::Function(_)));
    }

    #[test]
    fn test_format_defaults_to_client_and_can_be_overridden() {
        let (client, _) = capturing_client(MessageFormat::Binary);

        let inherited = client.producer(ProducerDefinition::<Order>::new("orders"));
        assert_eq!(inherited.format(), MessageFormat::Binary);

        let overridden = client.producer(ProducerDefinition::<Order>::new("orders").format(MessageFormat::Json));
        assert_eq!(overridden.format(), MessageFormat::Json);
    }

    #[test]
    fn test_build_message_matches_producer() {
        let (client, _) = capturing_client(MessageFormat::Json);
        let producer = client.producer(
            ProducerDefinition::<Order>::new("orders").key(KeyStrategy::field("customer.email")),
        );

        let message = producer.build_message(&order()).unwrap();

        assert_eq!(message.topic(), producer.topic());
        assert_eq!(message.format(), producer.format());
        assert_eq!(message.record().key, json!("buyer@example.com"));
        assert_eq!(
            message.record().value,
            json!({"id": 17, "customer": {"email": "buyer@example.com"}})
        );
    }

    #[test]
    fn test_send_hands_built_message_to_sender() {
        let (client, capturing) = capturing_client(MessageFormat::Json);
        let producer = client.producer(
            ProducerDefinition::<String>::new("test_topic").key_fn(|_| Ok(json!("get_key"))),
        );

        let expected = producer.build_message(&"test".to_string()).unwrap();
        producer.send(&"test".to_string()).unwrap();

        let messages = capturing.messages.lock().unwrap();
        assert_eq!(messages.as_slice(), &[expected]);
    }

    #[test]
    fn test_key_extraction_error_is_synchronous() {
        let (client, capturing) = capturing_client(MessageFormat::Json);
        let producer = client.producer(
            ProducerDefinition::<Order>::new("orders").key(KeyStrategy::field("customer.phone")),
        );

        let err = producer.send(&order()).unwrap_err();

        assert!(matches!(err, Error::KeyExtraction { ref topic, .. } if topic == "orders"));
        assert!(capturing.messages.lock().unwrap().is_empty());
        // nothing was built, so the sender was not needed either
        assert!(!client.is_sender_initialized());
    }

    #[test]
    fn test_all_producers_share_one_sender() {
        let (client, capturing) = capturing_client(MessageFormat::Json);
        let orders = client.producer(ProducerDefinition::<Order>::new("orders"));
        let audit = client
            .clone()
            .producer(ProducerDefinition::<String>::new("audit").format(MessageFormat::Binary));

        orders.send(&order()).unwrap();
        audit.send(&"opened".to_string()).unwrap();

        let messages = capturing.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].topic(), "audit");
        assert_eq!(messages[1].record().value, json!("b3BlbmVk"));
        assert!(Arc::ptr_eq(&client.sender().unwrap(), &orders.client.sender().unwrap()));
    }
}
