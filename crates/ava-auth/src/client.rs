use aws_sdk_cognitoidentityprovider::Client;

/// Build a Cognito Identity Provider client with a specific region.
pub async fn build_client_with_region(region: &str) -> Client {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await;
    Client::new(&config)
}

/// Region a user pool lives in, taken from its id (`us-east-1_AbC123`).
pub fn region_from_user_pool_id(user_pool_id: &str) -> Option<&str> {
    let (region, rest) = user_pool_id.split_once('_')?;
    if region.is_empty() || rest.is_empty() || !region.contains('-') {
        return None;
    }
    Some(region)
}
