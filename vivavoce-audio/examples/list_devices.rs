//! List available input devices

use vivavoce_audio::CpalCapture;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Input Devices on System:");
    for device in CpalCapture::list_devices()? {
        let marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("{:3}: {}{}", device.index, device.name, marker);
        println!(
            "     Channels: {}, Sample Rate: {} Hz",
            device.max_input_channels, device.default_sample_rate
        );
    }
    Ok(())
}
